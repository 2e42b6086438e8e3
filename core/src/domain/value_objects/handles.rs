//! Opaque handles passed between the flow and its collaborators.
//!
//! None of these are interpreted by the flow; their contents are only
//! meaningful to the collaborator that produced them. `Debug` output is
//! redacted so they never end up in logs.

use serde::{Deserialize, Serialize};

macro_rules! opaque_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}(..)", stringify!($name))
            }
        }
    };
}

opaque_handle!(
    /// Provider-side reference to an outstanding phone challenge
    ChallengeHandle
);

opaque_handle!(
    /// Reference to a rendered bot-check widget
    WidgetHandle
);

opaque_handle!(
    /// Proof that the bot check passed, forwarded to the provider
    BotCheckToken
);
