//! HTTP transport for the lead intake form.
//!
//! [`HttpLeadGateway`] implements [`pestquote_core::LeadGateway`] against the partner
//! backend: pricing is read from `GET {base}/api/partners/{id}/pricing` and leads are
//! created with `POST {base}/leads`.

mod http;

pub use http::{HttpLeadGateway, CSRF_HEADER};
