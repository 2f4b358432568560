use chrono::{DateTime, Utc};

use super::{BlogService, PostDetail, PostFormChoices, denied};
use crate::domain::{Post, PostDraft, PostRecord};
use crate::error::{DomainError, RepoError, ValidationErrors};
use crate::ports::BaseRepository;
use crate::visibility::{AuthorizationResult, Redirect, Viewer, authorize_mutation, is_visible_to};

impl BlogService {
    /// A post page. Missing and invisible posts are both `NotFound`.
    pub async fn post_detail(
        &self,
        viewer: Viewer,
        post_id: i32,
        now: DateTime<Utc>,
    ) -> Result<PostDetail, DomainError> {
        let post = self
            .feeds
            .load_record(post_id)
            .await?
            .filter(|record| is_visible_to(viewer, record, now))
            .ok_or_else(|| DomainError::not_found("post", post_id))?;
        let comments = self.comments_of(post_id).await?;
        Ok(PostDetail { post, comments })
    }

    pub async fn post_form_choices(&self) -> Result<PostFormChoices, DomainError> {
        Ok(PostFormChoices {
            categories: self.repos.categories.list().await?,
            locations: self.repos.locations.list().await?,
        })
    }

    /// Publishes a new post owned by the viewer.
    pub async fn create_post(
        &self,
        viewer: Viewer,
        draft: PostDraft,
    ) -> Result<(Post, Redirect), DomainError> {
        let author = self.require_user(viewer).await?;
        let pub_date = self.validate_draft(&draft).await?;

        let post = self
            .repos
            .posts
            .create(draft.into_new_post(author.id, pub_date))
            .await?;
        tracing::info!(post_id = post.id, author = %author.username, "Post created");

        Ok((post, Redirect::Profile(author.username)))
    }

    /// The post to prefill the edit form with, if the viewer wrote it.
    pub async fn post_for_edit(
        &self,
        viewer: Viewer,
        post_id: i32,
    ) -> Result<AuthorizationResult<PostRecord>, DomainError> {
        if !viewer.is_authenticated() {
            return Err(DomainError::AuthenticationRequired);
        }
        let record = self
            .feeds
            .load_record(post_id)
            .await?
            .ok_or_else(|| DomainError::not_found("post", post_id))?;

        Ok(
            match authorize_mutation(viewer, &record, || Redirect::PostDetail(post_id)) {
                AuthorizationResult::Allowed(()) => AuthorizationResult::Allowed(record),
                AuthorizationResult::DeniedRedirect(to) => denied(viewer, "post", post_id, to),
            },
        )
    }

    pub async fn edit_post(
        &self,
        viewer: Viewer,
        post_id: i32,
        draft: PostDraft,
    ) -> Result<AuthorizationResult<Redirect>, DomainError> {
        let mut post = self.find_post_for_mutation(viewer, post_id).await?;
        if let AuthorizationResult::DeniedRedirect(to) =
            authorize_mutation(viewer, &post, || Redirect::PostDetail(post_id))
        {
            return Ok(denied(viewer, "post", post_id, to));
        }

        let pub_date = self.validate_draft(&draft).await?;
        draft.apply_to(&mut post, pub_date);
        self.repos.posts.update(post).await?;
        tracing::info!(post_id, "Post updated");

        Ok(AuthorizationResult::Allowed(Redirect::PostDetail(post_id)))
    }

    /// Deletes a post and, through the store, its comments.
    pub async fn delete_post(
        &self,
        viewer: Viewer,
        post_id: i32,
    ) -> Result<AuthorizationResult<Redirect>, DomainError> {
        let post = self.find_post_for_mutation(viewer, post_id).await?;
        if let AuthorizationResult::DeniedRedirect(to) =
            authorize_mutation(viewer, &post, || Redirect::PostDetail(post_id))
        {
            return Ok(denied(viewer, "post", post_id, to));
        }

        self.repos.posts.delete(post.id).await.map_err(|e| match e {
            RepoError::NotFound => DomainError::not_found("post", post_id),
            other => other.into(),
        })?;
        tracing::info!(post_id, "Post deleted");

        Ok(AuthorizationResult::Allowed(
            self.profile_redirect(viewer).await?,
        ))
    }

    async fn find_post_for_mutation(&self, viewer: Viewer, post_id: i32) -> Result<Post, DomainError> {
        if !viewer.is_authenticated() {
            return Err(DomainError::AuthenticationRequired);
        }
        self.repos
            .posts
            .find_by_id(post_id)
            .await?
            .ok_or_else(|| DomainError::not_found("post", post_id))
    }

    /// Field validation plus existence of the referenced category and
    /// location. Returns the publication date.
    async fn validate_draft(&self, draft: &PostDraft) -> Result<DateTime<Utc>, DomainError> {
        let mut errors = match draft.validate() {
            Ok(()) => ValidationErrors::new(),
            Err(errors) => errors,
        };
        if let Some(id) = draft.category_id {
            if self.repos.categories.find_by_id(id).await?.is_none() {
                errors.add("category", "Select a valid choice.");
            }
        }
        if let Some(id) = draft.location_id {
            if self.repos.locations.find_by_id(id).await?.is_none() {
                errors.add("location", "Select a valid choice.");
            }
        }
        errors.into_result()?;
        draft
            .pub_date
            .ok_or_else(|| ValidationErrors::single("pub_date", "Enter a valid date/time.").into())
    }
}
