use crate::commands::{graph, profile, project};

#[derive(Clone, Copy)]
pub struct ExampleGroup {
    pub title: &'static str,
    pub commands: &'static [&'static str],
}

#[derive(Clone, Copy)]
pub struct CommandExample {
    pub name: &'static str,
    pub groups: &'static [ExampleGroup],
}

pub fn command_examples() -> &'static [CommandExample] {
    &[
        CommandExample {
            name: "profile",
            groups: profile::EXAMPLES,
        },
        CommandExample {
            name: "follow",
            groups: graph::EXAMPLES,
        },
        CommandExample {
            name: "following",
            groups: graph::EXAMPLES,
        },
        CommandExample {
            name: "project",
            groups: project::EXAMPLES,
        },
    ]
}
