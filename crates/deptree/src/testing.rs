use crate::runner::{CommandOutput, CommandRunner, CommandSpec};
use crate::Result;
use async_trait::async_trait;
use std::sync::Mutex;

type Handler = Box<dyn Fn(&CommandSpec) -> CommandOutput + Send + Sync>;

/// Answers every command through `handler` and remembers what was asked.
pub(crate) struct FakeRunner {
    handler: Handler,
    calls: Mutex<Vec<CommandSpec>>,
}

impl FakeRunner {
    pub(crate) fn new(handler: impl Fn(&CommandSpec) -> CommandOutput + Send + Sync + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        self.calls.lock().expect("calls lock").push(spec.clone());
        Ok((self.handler)(spec))
    }
}

/// Value of `--flag=value` or `-Dkey=value` style arguments.
pub(crate) fn arg_value<'a>(spec: &'a CommandSpec, prefix: &str) -> Option<&'a str> {
    spec.args.iter().find_map(|arg| arg.strip_prefix(prefix))
}

/// Argument following `flag`.
pub(crate) fn arg_after<'a>(spec: &'a CommandSpec, flag: &str) -> Option<&'a str> {
    spec.args
        .iter()
        .position(|arg| arg == flag)
        .and_then(|idx| spec.args.get(idx + 1))
        .map(String::as_str)
}
