use anyhow::Result;
use clap::{Args, Subcommand};
use syncodex::{NewProject, Visibility};

use crate::{
    context::AppContext,
    examples::ExampleGroup,
    output::OutputManager,
    views::ProjectList,
};

pub const EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Projects",
    commands: &[
        "syncodex --as u1 project publish \"Tiny VM\" --language rust --tag vm",
        "syncodex --as u1 project publish \"Notes\" --private",
        "syncodex project list u1                   # Public projects of u1",
    ],
}];

#[derive(Subcommand)]
pub enum ProjectCommands {
    /// Publish a project to the signed-in user's channel
    #[command(name = "publish")]
    Publish(PublishArgs),

    /// List a user's public projects
    #[command(name = "list")]
    List {
        /// Owner (defaults to the signed-in user)
        owner: Option<String>,
    },
}

#[derive(Args)]
pub struct PublishArgs {
    /// Project title
    pub title: String,

    #[arg(long, default_value = "")]
    pub description: String,

    #[arg(long)]
    pub language: Option<String>,

    /// Tag, may be repeated
    #[arg(long = "tag")]
    pub tags: Vec<String>,

    /// Hide the project from visitors
    #[arg(long)]
    pub private: bool,
}

pub async fn handle_project_commands(command: ProjectCommands, ctx: &AppContext, output: &OutputManager) -> Result<()> {
    match command {
        ProjectCommands::Publish(args) => {
            let project = NewProject {
                title: args.title,
                description: args.description,
                language: args.language,
                visibility: if args.private { Visibility::Private } else { Visibility::Public },
                tags: args.tags,
            };
            let project = ctx.channel.publish_project(ctx.viewer(), project).await?;
            output.success(&format!("Published '{}' as {}", project.title, project.id));
            output.display(&ProjectList(vec![project]))
        }
        ProjectCommands::List { owner } => {
            let owner = ctx.subject(owner.as_deref())?;
            let projects = ctx.channel.list_public_projects(&owner).await?;
            output.display(&ProjectList(projects))
        }
    }
}
