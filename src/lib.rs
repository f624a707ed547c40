// Hookshot - webhook construction, signing and self-verification
//
// This library builds a webhook payload, attaches credentials and a signature,
// checks the signature locally and sends it to a live, draft or validate
// endpoint.

// Re-export the engine
pub use hookshot_webhooks::*;

// Re-export member crates
pub use hookshot_http_client as http_client;
pub use hookshot_webhooks as webhooks;

#[cfg(feature = "log")]
pub use hookshot_log as log;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        AuthOptions,
        DispatchOptions,
        DispatchOutcome,
        EndpointKind,
        ErrorKind,
        FileField,
        FormField,
        PayloadOptions,
        SendOptions,
        SignatureAlgorithm,
        SigningOptions,
        ValidationOptions,
        WebhookClient,
        WebhookConfig,
        WebhookError,
        WebhookPayload,
        parse_header,
    };
    pub use hookshot_http_client::{HttpClient, HttpClientConfig};
}
