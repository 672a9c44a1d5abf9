//! Alert correlation and silence workflows for alertlark.
//!
//! `alertlark-core` holds the logic of the Alertmanager to Lark bridge,
//! independent of HTTP and of the chat platform's wire format.
//!
//! # Features
//!
//! - **Notification workflow**: post firing alerts as new messages, reply
//!   resolutions into the original message's thread
//! - **Correlation store**: `callback_id -> message id`, in memory or in Redis
//! - **Callback workflow**: turn a card interaction into an Alertmanager
//!   silence and confirm it in chat
//! - **Duration tokens**: the single table of supported silence lengths
//!
//! Collaborators are traits ([`Messenger`], [`CardRenderer`],
//! [`CorrelationStore`], [`AlertSource`], [`Clock`]) so the workflows can be
//! driven by fakes in tests.
//!
//! # Example
//!
//! ```rust
//! use alertlark_core::DurationToken;
//! use chrono::{Duration, TimeZone, Utc};
//!
//! let token: DurationToken = "1h".parse().unwrap();
//! assert_eq!(token.offset(), Duration::hours(1));
//!
//! let now = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
//! assert_eq!(token.display_expiry(now), "2024-05-01 18:00:00 WIB");
//!
//! assert!("2h".parse::<DurationToken>().is_err());
//! ```
//!
//! # Wiring
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use alertlark_core::{AlertmanagerClient, CallbackWorkflow, MemoryStore,
//!     NotificationWorkflow, SystemClock};
//!
//! let messenger = Arc::new(lark_client);
//! let source = Arc::new(AlertmanagerClient::new("alertmanager:9093", timeout)?);
//!
//! let notify = NotificationWorkflow::new(messenger.clone(), Arc::new(MemoryStore::new()), renderer);
//! let callback = CallbackWorkflow::new(messenger, source, SystemClock);
//!
//! notify.notify_alerts(&webhook).await?;
//! callback.process_event(&event).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod alertmanager;
pub mod callback;
pub mod clock;
pub mod duration;
pub mod error;
pub mod messaging;
pub mod notify;
#[cfg(feature = "redis")]
pub mod redis_store;
pub mod silence;
pub mod store;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod types;

// Re-export main types at crate root
pub use alertmanager::{AlertSource, AlertmanagerClient};
pub use callback::{CallbackOutcome, CallbackWorkflow};
pub use clock::{Clock, FixedClock, SystemClock};
pub use duration::{DISPLAY_OFFSET, DISPLAY_ZONE, DurationToken};
pub use error::{Collaborator, CoreError, Result};
pub use messaging::{CardRenderer, Messenger};
pub use notify::{AlertOutcome, Delivery, NotificationWorkflow};
#[cfg(feature = "redis")]
pub use redis_store::{RedisConfig, RedisStore};
pub use silence::{CreatedSilence, SilenceService};
pub use store::{CorrelationStore, MemoryStore};
pub use types::{
    CallbackAction, CallbackEvent, Matcher, SilenceRequest, SourceAlert, UserProfile,
    WebhookAction, WebhookAlert, WebhookPayload,
};
