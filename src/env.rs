use std::collections::HashMap;

/// Session-local state: the variable table used by `$name` substitution
/// and the exit flag commands raise to stop the read loop. The table
/// starts empty; nothing leaks in from the process environment.
#[derive(Debug, Default)]
pub struct Environment {
    vars: HashMap<String, String>,
    should_exit: bool,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_var(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn set_var(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn vars(&self) -> &HashMap<String, String> {
        &self.vars
    }

    pub fn request_exit(&mut self) {
        self.should_exit = true;
    }

    pub fn should_exit(&self) -> bool {
        self.should_exit
    }
}
