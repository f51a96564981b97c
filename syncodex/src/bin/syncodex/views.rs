//! Table and compact renderings of library results.

use comfy_table::{Cell, Table};
use serde::Serialize;
use syncodex::{ChannelView, Project, ReconcileReport, RelationCounts, UserId, UserProfile, Visibility};

use crate::{
    output::{GlobalOptions, TableDisplay, key_value_table, set_header, themed_table},
    theme::{BULLET, CHECK, CROSS, LOCK},
};

fn yes_no(value: bool) -> String {
    if value { CHECK } else { CROSS }.to_string()
}

#[derive(Serialize)]
#[serde(transparent)]
pub struct ProfileCard(pub UserProfile);

impl TableDisplay for ProfileCard {
    fn to_table(&self, options: &GlobalOptions) -> Table {
        let profile = &self.0;
        key_value_table(
            options,
            &[
                ("Id", profile.id.to_string()),
                ("Name", profile.display_name.clone()),
                ("Handle", format!("@{}", profile.handle())),
                ("Bio", profile.bio.clone()),
                ("Photo", profile.photo_url.clone().unwrap_or_default()),
                ("Followers", profile.followers.len().to_string()),
                ("Following", profile.following.len().to_string()),
                ("Joined", profile.created_at.format("%Y-%m-%d").to_string()),
            ],
        )
    }

    fn to_compact(&self) -> String {
        let counts = self.0.counts();
        format!(
            "{} @{} followers={} following={}",
            self.0.id,
            self.0.handle(),
            counts.followers,
            counts.following
        )
    }
}

#[derive(Serialize)]
#[serde(transparent)]
pub struct ProfileList(pub Vec<UserProfile>);

impl ProfileList {
    /// Sorted by handle so repeated runs print the same order.
    pub fn sorted(mut profiles: Vec<UserProfile>) -> Self {
        profiles.sort_by(|a, b| a.handle().cmp(b.handle()).then_with(|| a.id.cmp(&b.id)));
        Self(profiles)
    }
}

impl TableDisplay for ProfileList {
    fn to_table(&self, options: &GlobalOptions) -> Table {
        let mut table = themed_table(options);
        if self.0.is_empty() {
            table.add_row(vec![Cell::new("No users found")]);
            return table;
        }
        set_header(&mut table, options, &["Id", "Handle", "Name", "Followers", "Following"]);
        for profile in &self.0 {
            table.add_row(vec![
                Cell::new(profile.id.as_str()),
                Cell::new(format!("@{}", profile.handle())),
                Cell::new(&profile.display_name),
                Cell::new(profile.followers.len()),
                Cell::new(profile.following.len()),
            ]);
        }
        table
    }

    fn to_compact(&self) -> String {
        self.0
            .iter()
            .map(|profile| profile.id.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Serialize)]
pub struct RelationView {
    pub viewer: Option<UserId>,
    pub target: UserId,
    pub is_following: bool,
    pub counts: RelationCounts,
}

impl TableDisplay for RelationView {
    fn to_table(&self, options: &GlobalOptions) -> Table {
        key_value_table(
            options,
            &[
                ("Target", self.target.to_string()),
                ("Following", yes_no(self.is_following)),
                ("Followers", self.counts.followers.to_string()),
                ("Follows", self.counts.following.to_string()),
            ],
        )
    }

    fn to_compact(&self) -> String {
        format!("{} following={}", self.target, self.is_following)
    }
}

#[derive(Serialize)]
#[serde(transparent)]
pub struct ProjectList(pub Vec<Project>);

fn project_rows(table: &mut Table, options: &GlobalOptions, projects: &[Project]) {
    if projects.is_empty() {
        table.add_row(vec![Cell::new("No projects found")]);
        return;
    }
    set_header(table, options, &["Id", "Title", "Language", "Tags", "Published"]);
    for project in projects {
        let title = match project.visibility {
            Visibility::Public => project.title.clone(),
            Visibility::Private => format!("{} {}", LOCK, project.title),
        };
        table.add_row(vec![
            Cell::new(&project.id),
            Cell::new(title),
            Cell::new(project.language.as_deref().unwrap_or("-")),
            Cell::new(project.tags.join(", ")),
            Cell::new(project.created_at.format("%Y-%m-%d %H:%M").to_string()),
        ]);
    }
}

impl TableDisplay for ProjectList {
    fn to_table(&self, options: &GlobalOptions) -> Table {
        let mut table = themed_table(options);
        project_rows(&mut table, options, &self.0);
        table
    }

    fn to_compact(&self) -> String {
        self.0
            .iter()
            .map(|project| project.id.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Serialize)]
#[serde(transparent)]
pub struct ChannelPage(pub ChannelView);

impl TableDisplay for ChannelPage {
    fn to_table(&self, options: &GlobalOptions) -> Table {
        let view = &self.0;
        let mut table = key_value_table(
            options,
            &[
                ("Channel", format!("{} (@{})", view.profile.display_name, view.profile.handle())),
                ("Bio", view.profile.bio.clone()),
                ("Followers", view.counts.followers.to_string()),
                ("Following", view.counts.following.to_string()),
                ("You follow", if view.is_own_channel { "-".to_string() } else { yes_no(view.relation.is_following) }),
                ("Projects", view.projects.len().to_string()),
            ],
        );
        for project in &view.projects {
            table.add_row(vec![Cell::new(BULLET), Cell::new(&project.title)]);
        }
        table
    }

    fn to_compact(&self) -> String {
        let view = &self.0;
        format!(
            "{} followers={} following={} projects={} is_following={}",
            view.profile.id,
            view.counts.followers,
            view.counts.following,
            view.projects.len(),
            view.relation.is_following
        )
    }
}

#[derive(Serialize)]
#[serde(transparent)]
pub struct ReconcileView(pub ReconcileReport);

impl TableDisplay for ReconcileView {
    fn to_table(&self, options: &GlobalOptions) -> Table {
        let report = &self.0;
        let mut table = themed_table(options);
        set_header(&mut table, options, &["Set", "Added", "Removed"]);
        table.add_row(vec![
            Cell::new("following"),
            Cell::new(report.following_added.join(", ")),
            Cell::new(report.following_removed.join(", ")),
        ]);
        table.add_row(vec![
            Cell::new("followers"),
            Cell::new(report.followers_added.join(", ")),
            Cell::new(report.followers_removed.join(", ")),
        ]);
        table
    }

    fn to_compact(&self) -> String {
        let report = &self.0;
        format!(
            "{} following=+{}/-{} followers=+{}/-{}",
            report.user_id,
            report.following_added.len(),
            report.following_removed.len(),
            report.followers_added.len(),
            report.followers_removed.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::Utc;
    use syncodex::ProfileDefaults;

    use super::*;

    fn profile(id: &str, username: &str) -> UserProfile {
        let mut profile = UserProfile::new(
            UserId::parse(id).unwrap(),
            ProfileDefaults {
                display_name: id.to_uppercase(),
                username: username.to_string(),
                photo_url: None,
                bio: String::new(),
            },
            Utc::now(),
        );
        profile.followers = BTreeSet::from([UserId::parse("fan").unwrap()]);
        profile
    }

    #[test]
    fn profile_list_sorts_by_handle() {
        let list = ProfileList::sorted(vec![profile("u2", "zed"), profile("u1", "amy")]);
        assert_eq!(list.to_compact(), "u1 u2");
    }

    #[test]
    fn profile_card_compact_shows_counts() {
        let card = ProfileCard(profile("u1", "amy"));
        assert_eq!(card.to_compact(), "u1 @amy followers=1 following=0");
    }

    #[test]
    fn empty_project_list_renders_placeholder() {
        let rendered = ProjectList(Vec::new()).to_table(&GlobalOptions::default()).to_string();
        assert!(rendered.contains("No projects found"));
    }
}
