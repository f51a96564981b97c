use anyhow::Result;
use clap::Subcommand;
use syncodex::{CancellationToken, UserProfile};

use crate::{
    context::{AppContext, parse_user},
    examples::ExampleGroup,
    output::OutputManager,
    views::{ChannelPage, ProfileList, ReconcileView, RelationView},
};

pub const EXAMPLES: &[ExampleGroup] = &[
    ExampleGroup {
        title: "Follow",
        commands: &[
            "syncodex --as u1 follow u2       # Start following u2",
            "syncodex --as u1 unfollow u2     # Stop following u2",
            "syncodex --as u1 status u2       # Does u1 follow u2?",
        ],
    },
    ExampleGroup {
        title: "Listings",
        commands: &[
            "syncodex --as u1 following       # Who u1 follows",
            "syncodex --as u1 followers       # Who follows u1",
            "syncodex --as u1 mutuals --output json",
        ],
    },
    ExampleGroup {
        title: "Maintenance",
        commands: &["syncodex reconcile u1            # Rebuild u1's sets from follow edges"],
    },
];

#[derive(Subcommand)]
pub enum GraphCommands {
    /// Follow a user
    Follow {
        /// User id to follow
        target: String,
    },

    /// Stop following a user
    Unfollow {
        /// User id to unfollow
        target: String,
    },

    /// Show whether the signed-in user follows someone
    Status {
        /// User id to check
        target: String,
    },

    /// List the users the signed-in user follows
    Following,

    /// List the users following the signed-in user
    Followers,

    /// List users who follow each other with the signed-in user
    Mutuals,

    /// Repair a user's following/followers sets from the follow edges
    Reconcile {
        /// User id (defaults to the signed-in user)
        user: Option<String>,
    },

    /// Show a user's channel page
    Channel {
        /// Channel owner
        owner: String,
    },
}

pub async fn handle_graph_commands(command: GraphCommands, ctx: &AppContext, output: &OutputManager) -> Result<()> {
    match command {
        GraphCommands::Follow { target } => {
            let target = parse_user(&target)?;
            ctx.graph.follow(ctx.viewer(), &target).await?;
            output.success(&format!("Following {target}"));
        }
        GraphCommands::Unfollow { target } => {
            let target = parse_user(&target)?;
            ctx.graph.unfollow(ctx.viewer(), &target).await?;
            output.success(&format!("No longer following {target}"));
        }
        GraphCommands::Status { target } => {
            let target = parse_user(&target)?;
            let status = ctx.graph.relation_status(ctx.viewer(), &target).await?;
            let counts = ctx.graph.relation_counts(&target).await?;
            output.display(&RelationView {
                viewer: ctx.viewer().map(|viewer| viewer.id.clone()),
                target,
                is_following: status.is_following,
                counts,
            })?;
        }
        GraphCommands::Following => {
            output.progress("Loading profiles");
            let cancel = cancel_on_interrupt();
            let profiles = ctx.graph.list_following_with(ctx.viewer(), &cancel).await;
            output.clear_line();
            show_profiles(profiles?, output)?;
        }
        GraphCommands::Followers => {
            output.progress("Loading profiles");
            let cancel = cancel_on_interrupt();
            let profiles = ctx.graph.list_followers_with(ctx.viewer(), &cancel).await;
            output.clear_line();
            show_profiles(profiles?, output)?;
        }
        GraphCommands::Mutuals => {
            let profiles = ctx.graph.mutual_follows(ctx.viewer()).await?;
            show_profiles(profiles, output)?;
        }
        GraphCommands::Reconcile { user } => {
            let user_id = ctx.subject(user.as_deref())?;
            let report = ctx.graph.reconcile(&user_id).await?;
            if report.is_clean() {
                output.success(&format!("{user_id} is already consistent"));
            } else {
                output.warning(&format!("Repaired relation sets for {user_id}"));
                output.display(&ReconcileView(report))?;
            }
        }
        GraphCommands::Channel { owner } => {
            let owner = parse_user(&owner)?;
            let view = ctx.channel.load_channel(ctx.viewer(), &owner).await?;
            output.display(&ChannelPage(view))?;
        }
    }
    Ok(())
}

fn show_profiles(profiles: Vec<UserProfile>, output: &OutputManager) -> Result<()> {
    output.verbose(&format!("{} profiles resolved", profiles.len()));
    output.display(&ProfileList::sorted(profiles))
}

/// Token cancelled when the user hits Ctrl-C, abandoning pending lookups.
fn cancel_on_interrupt() -> CancellationToken {
    let cancel = CancellationToken::new();
    let guard = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            guard.cancel();
        }
    });
    cancel
}
