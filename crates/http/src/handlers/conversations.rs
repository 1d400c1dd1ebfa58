use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};

use crate::AppState;
use crate::api_error::ApiError;
use crate::request_types::{CreateConversationRequest, SaveMessagesRequest, TitleRequest, lenient};
use crate::response_types::{
    ConversationListResponse, ConversationResponse, CreatedConversationResponse, DeleteResponse,
    MessagesResponse, SuccessResponse, TitleResponse, TreeResponse,
};

pub async fn list_conversations(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ConversationListResponse>, ApiError> {
    let conversations = state.conversations.list().await?;
    Ok(Json(ConversationListResponse { success: true, conversations }))
}

pub async fn create_conversation(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<CreatedConversationResponse>, ApiError> {
    let req: CreateConversationRequest = lenient(&body);
    let conversation =
        state.conversations.create(req.prompt_text.as_deref().unwrap_or_default()).await?;
    Ok(Json(CreatedConversationResponse {
        conversation_id: conversation.id,
        title: conversation.title,
        prompt_text: None,
    }))
}

/// Create without a title so the first message is not blocked on the LLM.
pub async fn quick_create_conversation(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<CreatedConversationResponse>, ApiError> {
    let req: CreateConversationRequest = lenient(&body);
    let conversation = state.conversations.quick_create().await?;
    Ok(Json(CreatedConversationResponse {
        conversation_id: conversation.id,
        title: None,
        prompt_text: Some(req.prompt_text.unwrap_or_default()),
    }))
}

pub async fn get_conversation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ConversationResponse>, ApiError> {
    let conversation = state.conversations.get(&id).await?;
    Ok(Json(ConversationResponse { success: true, conversation }))
}

pub async fn delete_conversation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let deleted = state.conversations.delete(&id).await?;
    Ok(Json(DeleteResponse { success: true, deleted }))
}

pub async fn get_messages(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MessagesResponse>, ApiError> {
    let messages = state.conversations.messages(&id).await?;
    Ok(Json(MessagesResponse { success: true, messages }))
}

pub async fn save_messages(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<SuccessResponse>, ApiError> {
    let messages = serde_json::from_slice::<SaveMessagesRequest>(&body)
        .ok()
        .and_then(|req| req.messages)
        .ok_or_else(|| ApiError::BadRequest("messages array is required".to_owned()))?;
    state.conversations.save_messages(&id, &messages).await?;
    Ok(Json(SuccessResponse { success: true }))
}

pub async fn generate_title(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<TitleResponse>, ApiError> {
    let req: TitleRequest = lenient(&body);
    let title =
        state.conversations.generate_title(&id, req.prompt_text.as_deref(), req.force).await?;
    Ok(Json(TitleResponse { success: true, title }))
}

pub async fn get_tree(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TreeResponse>, ApiError> {
    let tree = state.conversations.tree(&id).await?;
    Ok(Json(TreeResponse { success: true, tree: tree.tree, versions: tree.versions }))
}
