//! Channel pages: profile edits, project publishing and the per-visitor view
//! of another user's public page.

use chrono::Utc;
use log::debug;
use serde::Serialize;

use crate::{
    errors::{GraphError, ValidationError},
    graph::FollowGraphService,
    id::{UserId, generate_project_id},
    identity::{self, Identity},
    models::{
        NewProject, PROJECTS, ProfilePatch, Project, RelationCounts, RelationStatus, USERS, UserProfile, Visibility,
        decode_document, encode_document,
    },
    store::{DocumentStore, FieldFilter, SetOptions, WriteBatch},
};

/// Everything a channel page renders for one visitor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelView {
    pub profile: UserProfile,
    pub counts: RelationCounts,
    pub relation: RelationStatus,
    pub projects: Vec<Project>,
    pub is_own_channel: bool,
}

pub struct ChannelService<S> {
    graph: FollowGraphService<S>,
}

impl<S> Clone for ChannelService<S> {
    fn clone(&self) -> Self {
        Self {
            graph: self.graph.clone(),
        }
    }
}

impl<S> ChannelService<S>
where
    S: DocumentStore,
{
    pub fn new(graph: FollowGraphService<S>) -> Self {
        Self { graph }
    }

    pub fn graph(&self) -> &FollowGraphService<S> {
        &self.graph
    }

    /// Merges the provided display fields into the caller's profile.
    /// Relation sets are never touched here.
    pub async fn update_profile(
        &self,
        identity: Option<&Identity>,
        patch: ProfilePatch,
    ) -> Result<UserProfile, GraphError> {
        let identity = identity::require(identity)?;
        patch.validate()?;
        let current = self.graph.require_profile(&identity.id).await?;
        if patch.is_empty() {
            return Ok(current);
        }

        if let Some(username) = &patch.username
            && username != &current.username
        {
            if self.graph.username_taken(username, &identity.id).await? {
                return Err(ValidationError::single("username", "username_taken", "That username is already taken.").into());
            }
        }

        let id = identity.id.as_str();
        let mut document = encode_document(USERS, id, &patch)?;
        if let Some(fields) = document.as_object_mut() {
            fields.insert("updated_at".to_string(), encode_document(USERS, id, &Utc::now())?);
        }
        self.graph
            .commit("update_profile", WriteBatch::new().set(USERS, id, document, SetOptions::merge()))
            .await?;
        debug!("updated profile {id}");
        self.graph.require_profile(&identity.id).await
    }

    pub async fn publish_project(&self, identity: Option<&Identity>, project: NewProject) -> Result<Project, GraphError> {
        let identity = identity::require(identity)?;
        project.validate()?;
        self.graph.require_profile(&identity.id).await?;

        let project = Project {
            id: generate_project_id(),
            owner_id: identity.id.clone(),
            title: project.title.trim().to_string(),
            description: project.description,
            language: project.language,
            visibility: project.visibility,
            tags: project.tags,
            created_at: Utc::now(),
        };
        let document = encode_document(PROJECTS, &project.id, &project)?;
        self.graph
            .commit(
                "publish_project",
                WriteBatch::new().create_if_absent(PROJECTS, &project.id, document),
            )
            .await?;
        debug!("{} published project {}", identity.id, project.id);
        Ok(project)
    }

    /// Public projects owned by `owner`, newest first.
    pub async fn list_public_projects(&self, owner: &UserId) -> Result<Vec<Project>, GraphError> {
        self.projects(owner, true).await
    }

    async fn projects(&self, owner: &UserId, public_only: bool) -> Result<Vec<Project>, GraphError> {
        let mut filters = vec![FieldFilter::eq("owner_id", owner.as_str())];
        if public_only {
            filters.push(FieldFilter::eq("visibility", Visibility::Public.as_str()));
        }
        let mut projects = self
            .graph
            .query(PROJECTS, &filters)
            .await?
            .into_iter()
            .map(|doc| decode_document::<Project>(PROJECTS, &doc.id, doc.data))
            .collect::<Result<Vec<_>, _>>()?;
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(projects)
    }

    /// Assembles `owner`'s channel as seen by `viewer`. The owner sees their
    /// private projects too.
    pub async fn load_channel(&self, viewer: Option<&Identity>, owner: &UserId) -> Result<ChannelView, GraphError> {
        let is_own_channel = viewer.is_some_and(|viewer| &viewer.id == owner);
        let (profile, relation, projects) = futures::try_join!(
            self.graph.require_profile(owner),
            self.graph.relation_status(viewer, owner),
            self.projects(owner, !is_own_channel),
        )?;
        Ok(ChannelView {
            counts: profile.counts(),
            profile,
            relation,
            projects,
            is_own_channel,
        })
    }
}
