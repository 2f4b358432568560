use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::{BlogService, denied};
use crate::domain::{Comment, CommentDraft, CommentRecord, NewComment};
use crate::error::{DomainError, RepoError};
use crate::ports::BaseRepository;
use crate::visibility::{AuthorizationResult, Redirect, Viewer, authorize_mutation, is_visible_to};

impl BlogService {
    /// Comments of a post with their authors, oldest first.
    pub async fn comments_of(&self, post_id: i32) -> Result<Vec<CommentRecord>, DomainError> {
        let comments = self.repos.comments.find_by_post(post_id).await?;
        let mut author_ids: Vec<i32> = comments.iter().map(|c| c.author_id).collect();
        author_ids.sort_unstable();
        author_ids.dedup();

        let authors: HashMap<_, _> = self
            .repos
            .users
            .find_many(&author_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        comments
            .into_iter()
            .map(|comment| -> Result<CommentRecord, DomainError> {
                let author = authors.get(&comment.author_id).cloned().ok_or_else(|| {
                    DomainError::Internal(format!(
                        "comment {} references missing author {}",
                        comment.id, comment.author_id
                    ))
                })?;
                Ok(CommentRecord { comment, author })
            })
            .collect()
    }

    /// Comments on a post the viewer can read.
    pub async fn add_comment(
        &self,
        viewer: Viewer,
        post_id: i32,
        draft: CommentDraft,
        now: DateTime<Utc>,
    ) -> Result<Redirect, DomainError> {
        let author = self.require_user(viewer).await?;
        self.feeds
            .load_record(post_id)
            .await?
            .filter(|record| is_visible_to(viewer, record, now))
            .ok_or_else(|| DomainError::not_found("post", post_id))?;
        draft.validate()?;

        let comment = self
            .repos
            .comments
            .create(NewComment {
                text: draft.text,
                author_id: author.id,
                post_id,
            })
            .await?;
        tracing::info!(comment_id = comment.id, post_id, "Comment added");

        Ok(Redirect::PostDetail(post_id))
    }

    /// The comment to prefill the edit or delete page with.
    pub async fn comment_for_edit(
        &self,
        viewer: Viewer,
        post_id: i32,
        comment_id: i32,
    ) -> Result<AuthorizationResult<CommentRecord>, DomainError> {
        let comment = self.find_comment(viewer, post_id, comment_id).await?;
        if let AuthorizationResult::DeniedRedirect(to) =
            authorize_mutation(viewer, &comment, || Redirect::PostDetail(post_id))
        {
            return Ok(denied(viewer, "comment", comment_id, to));
        }

        let author = self
            .repos
            .users
            .find_by_id(comment.author_id)
            .await?
            .ok_or_else(|| DomainError::not_found("user", comment.author_id))?;
        Ok(AuthorizationResult::Allowed(CommentRecord { comment, author }))
    }

    pub async fn edit_comment(
        &self,
        viewer: Viewer,
        post_id: i32,
        comment_id: i32,
        draft: CommentDraft,
    ) -> Result<AuthorizationResult<Redirect>, DomainError> {
        let mut comment = self.find_comment(viewer, post_id, comment_id).await?;
        if let AuthorizationResult::DeniedRedirect(to) =
            authorize_mutation(viewer, &comment, || Redirect::PostDetail(post_id))
        {
            return Ok(denied(viewer, "comment", comment_id, to));
        }

        draft.validate()?;
        comment.text = draft.text;
        self.repos.comments.update(comment).await?;
        tracing::info!(comment_id, post_id, "Comment updated");

        Ok(AuthorizationResult::Allowed(Redirect::PostDetail(post_id)))
    }

    pub async fn delete_comment(
        &self,
        viewer: Viewer,
        post_id: i32,
        comment_id: i32,
    ) -> Result<AuthorizationResult<Redirect>, DomainError> {
        let comment = self.find_comment(viewer, post_id, comment_id).await?;
        if let AuthorizationResult::DeniedRedirect(to) =
            authorize_mutation(viewer, &comment, || Redirect::PostDetail(post_id))
        {
            return Ok(denied(viewer, "comment", comment_id, to));
        }

        self.repos
            .comments
            .delete(comment.id)
            .await
            .map_err(|e| match e {
                RepoError::NotFound => DomainError::not_found("comment", comment_id),
                other => other.into(),
            })?;
        tracing::info!(comment_id, post_id, "Comment deleted");

        Ok(AuthorizationResult::Allowed(
            self.profile_redirect(viewer).await?,
        ))
    }

    /// A comment addressed through the wrong post does not exist.
    async fn find_comment(
        &self,
        viewer: Viewer,
        post_id: i32,
        comment_id: i32,
    ) -> Result<Comment, DomainError> {
        if !viewer.is_authenticated() {
            return Err(DomainError::AuthenticationRequired);
        }
        self.repos
            .comments
            .find_by_id(comment_id)
            .await?
            .filter(|c| c.post_id == post_id)
            .ok_or_else(|| DomainError::not_found("comment", comment_id))
    }
}
