use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use syncodex::{GetOrCreateResult, ProfileDefaults, ProfilePatch};

use crate::{context::AppContext, examples::ExampleGroup, output::OutputManager, views::ProfileCard};

pub const EXAMPLES: &[ExampleGroup] = &[
    ExampleGroup {
        title: "First Sign-in",
        commands: &[
            "syncodex --as u1 profile init --name \"Ada Lovelace\"   # Create the profile if missing",
        ],
    },
    ExampleGroup {
        title: "View and Edit",
        commands: &[
            "syncodex --as u1 profile show                # Your own profile",
            "syncodex profile show u2                     # Anyone's profile",
            "syncodex --as u1 profile edit --bio \"Rust\"   # Update selected fields",
        ],
    },
];

#[derive(Subcommand)]
pub enum ProfileCommands {
    /// Create the signed-in user's profile if it does not exist yet
    #[command(name = "init")]
    Init(InitArgs),

    /// Show a profile
    #[command(name = "show")]
    Show {
        /// User id (defaults to the signed-in user)
        user: Option<String>,
    },

    /// Edit display fields of the signed-in user's profile
    #[command(name = "edit")]
    Edit(EditArgs),
}

#[derive(Args)]
pub struct InitArgs {
    /// Display name from the identity provider
    #[arg(long)]
    pub name: Option<String>,

    /// Photo URL from the identity provider
    #[arg(long)]
    pub photo_url: Option<String>,

    /// Email from the identity provider
    #[arg(long)]
    pub email: Option<String>,
}

#[derive(Args)]
pub struct EditArgs {
    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub username: Option<String>,

    #[arg(long)]
    pub bio: Option<String>,

    #[arg(long)]
    pub photo_url: Option<String>,
}

pub async fn handle_profile_commands(command: ProfileCommands, ctx: &AppContext, output: &OutputManager) -> Result<()> {
    match command {
        ProfileCommands::Init(args) => handle_init(args, ctx, output).await,
        ProfileCommands::Show { user } => {
            let user_id = ctx.subject(user.as_deref())?;
            let profile = ctx.graph.require_profile(&user_id).await?;
            output.display(&ProfileCard(profile))
        }
        ProfileCommands::Edit(args) => handle_edit(args, ctx, output).await,
    }
}

async fn handle_init(args: InitArgs, ctx: &AppContext, output: &OutputManager) -> Result<()> {
    let Some(identity) = ctx.viewer() else {
        bail!("Sign in with --as <user> (or SYNCODEX_USER) to create a profile.");
    };
    let mut identity = identity.clone();
    identity.display_name = args.name;
    identity.photo_url = args.photo_url;
    identity.email = args.email;

    let defaults = ProfileDefaults::from_identity(&identity);
    match ctx.graph.ensure_profile_initialized(&identity, defaults).await? {
        GetOrCreateResult::Created(profile) => {
            output.success(&format!("Created profile @{}", profile.handle()));
            output.display(&ProfileCard(profile))
        }
        GetOrCreateResult::Found(profile) => {
            output.info("Profile already exists; nothing changed.");
            output.display(&ProfileCard(profile))
        }
    }
}

async fn handle_edit(args: EditArgs, ctx: &AppContext, output: &OutputManager) -> Result<()> {
    let patch = ProfilePatch {
        display_name: args.name,
        username: args.username,
        photo_url: args.photo_url,
        bio: args.bio,
    };
    if patch.is_empty() {
        output.warning("No fields given; pass at least one of --name, --username, --bio, --photo-url.");
        return Ok(());
    }
    let profile = ctx.channel.update_profile(ctx.viewer(), patch).await?;
    output.success("Profile updated");
    output.display(&ProfileCard(profile))
}
