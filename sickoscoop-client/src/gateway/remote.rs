use crate::gateway::{ApiRequest, Gateway, GatewayError, normalize};
use async_trait::async_trait;
use serde::Serialize;
use sickoscoop_common::model::{
    auth::{AuthResponse, AuthToken, Credentials, Registration},
    chat::Conversation,
    post::{CreateComment, CreatePost, LikeResponse, Post, PostId},
    user::User,
};

/// The backend operations the client relies on.
#[async_trait]
pub trait SocialRemote: Send + Sync {
    async fn health(&self) -> Result<(), GatewayError>;

    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, GatewayError>;

    async fn register(&self, registration: &Registration) -> Result<AuthResponse, GatewayError>;

    async fn verify(&self, token: &AuthToken) -> Result<User, GatewayError>;

    async fn posts(&self, token: Option<&AuthToken>) -> Result<Vec<Post>, GatewayError>;

    async fn public_posts(&self) -> Result<Vec<Post>, GatewayError>;

    async fn create_post(&self, post: &CreatePost) -> Result<Post, GatewayError>;

    async fn like_post(&self, post_id: &PostId) -> Result<LikeResponse, GatewayError>;

    async fn comment_post(
        &self,
        post_id: &PostId,
        comment: &CreateComment,
    ) -> Result<(), GatewayError>;

    async fn conversations(
        &self,
        token: Option<&AuthToken>,
    ) -> Result<Vec<Conversation>, GatewayError>;
}

fn json_body(body: &impl Serialize) -> Result<ApiRequest, GatewayError> {
    Ok(ApiRequest::post(serde_json::to_value(body)?))
}

#[async_trait]
impl SocialRemote for Gateway {
    async fn health(&self) -> Result<(), GatewayError> {
        self.call("/health", ApiRequest::get(), None).await?;
        Ok(())
    }

    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, GatewayError> {
        let response = self.call("/auth/login", json_body(credentials)?, None).await?;
        Ok(serde_json::from_value(response)?)
    }

    async fn register(&self, registration: &Registration) -> Result<AuthResponse, GatewayError> {
        let response = self
            .call("/auth/register", json_body(registration)?, None)
            .await?;
        Ok(serde_json::from_value(response)?)
    }

    async fn verify(&self, token: &AuthToken) -> Result<User, GatewayError> {
        let response = self
            .call("/auth/verify", ApiRequest::post_empty(), Some(token))
            .await?;
        Ok(normalize::entity(response, "user")?)
    }

    async fn posts(&self, token: Option<&AuthToken>) -> Result<Vec<Post>, GatewayError> {
        let response = self.call("/posts", ApiRequest::get(), token).await?;
        Ok(normalize::collection(response, "posts")?)
    }

    async fn public_posts(&self) -> Result<Vec<Post>, GatewayError> {
        let response = self.call("/posts/public", ApiRequest::get(), None).await?;
        Ok(normalize::collection(response, "posts")?)
    }

    async fn create_post(&self, post: &CreatePost) -> Result<Post, GatewayError> {
        let response = self.call("/posts", json_body(post)?, None).await?;
        Ok(normalize::entity(response, "post")?)
    }

    async fn like_post(&self, post_id: &PostId) -> Result<LikeResponse, GatewayError> {
        let response = self
            .call(
                &format!("/posts/{post_id}/like"),
                ApiRequest::post_empty(),
                None,
            )
            .await?;
        Ok(serde_json::from_value(response)?)
    }

    async fn comment_post(
        &self,
        post_id: &PostId,
        comment: &CreateComment,
    ) -> Result<(), GatewayError> {
        self.call(
            &format!("/posts/{post_id}/comments"),
            json_body(comment)?,
            None,
        )
        .await?;
        Ok(())
    }

    async fn conversations(
        &self,
        token: Option<&AuthToken>,
    ) -> Result<Vec<Conversation>, GatewayError> {
        let response = self.call("/conversations", ApiRequest::get(), token).await?;
        Ok(normalize::collection(response, "conversations")?)
    }
}
