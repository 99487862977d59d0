//! Handlers for the staff API and the WhatsApp webhook.

pub mod menu;
pub mod order;
pub mod webhook;

use dine_core::{EngineError, StoreError};
use dine_types::APIError;

/// Maps store failures onto HTTP errors.
pub(crate) fn store_error(e: StoreError) -> APIError {
	match e {
		StoreError::MenuItemNotFound(_) => {
			APIError::not_found("MENU_ITEM_NOT_FOUND", "Menu item not found")
		},
		StoreError::OrderNotFound(_) => APIError::not_found("ORDER_NOT_FOUND", "Order not found"),
		StoreError::InvalidTransition { .. } => {
			APIError::bad_request("INVALID_STATUS_TRANSITION", e.to_string())
		},
		StoreError::Invalid(message) => APIError::bad_request("INVALID_REQUEST", message),
		StoreError::Storage(message) => {
			tracing::error!(error = %message, "Storage failure");
			APIError::internal("Storage unavailable")
		},
	}
}

/// Maps engine failures onto HTTP errors.
pub(crate) fn engine_error(e: EngineError) -> APIError {
	match e {
		EngineError::InvalidOrder(failure) => {
			APIError::bad_request("INVALID_ORDER", failure.to_string())
		},
		EngineError::CannotCancel(_) => APIError::bad_request("ORDER_NOT_CANCELLABLE", e.to_string()),
		EngineError::Store(e) => store_error(e),
	}
}
