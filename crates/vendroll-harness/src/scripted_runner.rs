//! Scripted implementation of [`CommandRunner`].
//!
//! Answers each invocation from a table of rules keyed by program name and
//! argument prefix, and records every invocation for later assertions. Rules
//! added later take precedence, so a fixture can install defaults and a test
//! can override one of them. Unmatched invocations succeed with empty output.

use std::sync::{Mutex, PoisonError};

use vendroll_core::{CommandRunner, Invocation, ProcessFailure};

/// Behaviour attached to a rule.
pub type Effect = Box<dyn Fn(&Invocation) -> Result<Vec<u8>, ProcessFailure> + Send + Sync>;

struct Rule {
    program: String,
    prefix: Vec<String>,
    effect: Effect,
}

impl Rule {
    fn matches(&self, inv: &Invocation) -> bool {
        inv.program == self.program
            && inv.args.len() >= self.prefix.len()
            && self.prefix.iter().zip(&inv.args).all(|(want, got)| want == got)
    }
}

/// Command runner driven by a rule table.
#[derive(Default)]
pub struct ScriptedRunner {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<Invocation>>,
}

impl ScriptedRunner {
    /// Runner with no rules: everything succeeds silently.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `effect` for invocations of `program` whose arguments start with
    /// `prefix`.
    pub fn on<E>(&self, program: &str, prefix: &[&str], effect: E) -> &Self
    where
        E: Fn(&Invocation) -> Result<Vec<u8>, ProcessFailure> + Send + Sync + 'static,
    {
        let rule = Rule {
            program: program.to_string(),
            prefix: prefix.iter().map(|s| (*s).to_string()).collect(),
            effect: Box::new(effect),
        };
        self.rules.lock().unwrap_or_else(PoisonError::into_inner).push(rule);
        self
    }

    /// Succeed with fixed output.
    pub fn respond(&self, program: &str, prefix: &[&str], output: &str) -> &Self {
        let output = output.as_bytes().to_vec();
        self.on(program, prefix, move |_| Ok(output.clone()))
    }

    /// Exit with `status` and `output`.
    pub fn fail(&self, program: &str, prefix: &[&str], status: i32, output: &str) -> &Self {
        let output = output.to_string();
        self.on(program, prefix, move |inv| Err(inv.failure(Some(status), output.clone())))
    }

    /// Every invocation so far, in order.
    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Invocations of `program` whose arguments start with `prefix`.
    pub fn calls_to(&self, program: &str, prefix: &[&str]) -> Vec<Invocation> {
        self.calls()
            .into_iter()
            .filter(|inv| {
                inv.program == program
                    && inv.args.len() >= prefix.len()
                    && prefix.iter().zip(&inv.args).all(|(want, got)| want == got)
            })
            .collect()
    }

    /// Whether `program` was run with arguments starting with `prefix`.
    pub fn ran(&self, program: &str, prefix: &[&str]) -> bool {
        !self.calls_to(program, prefix).is_empty()
    }

    /// Rendered command lines, for readable assertions.
    pub fn command_lines(&self) -> Vec<String> {
        self.calls().iter().map(ToString::to_string).collect()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, invocation: &Invocation) -> Result<Vec<u8>, ProcessFailure> {
        tracing::trace!(command = %invocation, "scripted");
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(invocation.clone());

        let rules = self.rules.lock().unwrap_or_else(PoisonError::into_inner);
        match rules.iter().rev().find(|rule| rule.matches(invocation)) {
            Some(rule) => (rule.effect)(invocation),
            None => Ok(Vec::new()),
        }
    }
}
