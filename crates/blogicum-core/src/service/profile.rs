use super::BlogService;
use crate::domain::{ProfileChanges, User};
use crate::error::{DomainError, ValidationErrors};
use crate::ports::BaseRepository;
use crate::visibility::Viewer;

impl BlogService {
    pub async fn current_user(&self, viewer: Viewer) -> Result<User, DomainError> {
        self.require_user(viewer).await
    }

    /// Updates the viewer's own profile. Usernames stay unique.
    pub async fn edit_profile(
        &self,
        viewer: Viewer,
        changes: ProfileChanges,
    ) -> Result<User, DomainError> {
        let mut user = self.require_user(viewer).await?;
        changes.validate()?;

        if let Some(other) = self.repos.users.find_by_username(&changes.username).await? {
            if other.id != user.id {
                return Err(ValidationErrors::single(
                    "username",
                    "A user with that username already exists.",
                )
                .into());
            }
        }

        changes.apply_to(&mut user);
        let user = self.repos.users.update(user).await?;
        tracing::info!(user_id = user.id, "Profile updated");
        Ok(user)
    }
}
