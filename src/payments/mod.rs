mod stripe;

pub use stripe::{
    CheckoutMetadata, CheckoutSessionObject, DisputeObject, InvoiceObject, StripeClient,
    StripeEvent, StripeEventKind, SubscriptionObject, WEBHOOK_BODY_LIMIT,
};
