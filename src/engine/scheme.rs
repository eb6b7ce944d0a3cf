//! Scheme dispatch table
//!
//! Maps a URI scheme to the host handler that synthesizes responses for it.
//! Lives on the UI thread; handlers run inline while the browser engine
//! waits on the resource load, so they must return promptly.

use super::resource::{ResourceRequest, ResourceResponse, SchemeResponse};
use std::collections::HashMap;
use std::fmt;

/// Host callback producing a payload for a request URI, or `None` to let
/// the engine load the resource normally.
pub type SchemeHandler = Box<dyn FnMut(&str) -> Option<SchemeResponse>>;

/// Per-window scheme → handler mapping
#[derive(Default)]
pub struct SchemeTable {
    handlers: HashMap<String, SchemeHandler>,
}

impl SchemeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `handler` for `scheme`, returning any handler it replaces
    pub fn register(
        &mut self,
        scheme: impl Into<String>,
        handler: SchemeHandler,
    ) -> Option<SchemeHandler> {
        self.handlers.insert(scheme.into(), handler)
    }

    pub fn contains(&self, scheme: &str) -> bool {
        self.handlers.contains_key(scheme)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Run the handler for `scheme` against `uri`.
    ///
    /// A payload without a content type counts as no response.
    pub fn dispatch(&mut self, scheme: &str, uri: &str) -> Option<ResourceResponse> {
        let handler = self.handlers.get_mut(scheme)?;
        let response = handler(uri)?;
        if response.content_type.is_empty() {
            log::debug!("[scheme] handler for '{}' returned no content type", scheme);
            return None;
        }
        Some(response.into())
    }

    /// Resolve an intercepted request. `None` means default loading.
    pub fn intercept(&mut self, request: &ResourceRequest) -> Option<ResourceResponse> {
        let scheme = scheme_of(request.uri())?;
        self.dispatch(scheme, request.uri())
    }
}

impl fmt::Debug for SchemeTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut schemes: Vec<_> = self.handlers.keys().collect();
        schemes.sort();
        f.debug_struct("SchemeTable").field("schemes", &schemes).finish()
    }
}

/// Text before the first `:`; `None` when there is no colon or the prefix
/// is empty.
pub fn scheme_of(uri: &str) -> Option<&str> {
    match uri.split_once(':') {
        Some((scheme, _)) if !scheme.is_empty() => Some(scheme),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn html(body: &'static str) -> SchemeHandler {
        Box::new(move |_: &str| Some(SchemeResponse::new(body, "text/html")))
    }

    #[test]
    fn test_scheme_of() {
        assert_eq!(scheme_of("app://test/page"), Some("app"));
        assert_eq!(scheme_of("mailto:someone@example.com"), Some("mailto"));
        assert_eq!(scheme_of("relative/path"), None);
        assert_eq!(scheme_of(":nothing"), None);
    }

    #[test]
    fn test_last_registration_wins() {
        let mut table = SchemeTable::new();
        assert!(table.register("app", html("first")).is_none());
        assert!(table.register("app", html("second")).is_some());
        assert_eq!(table.len(), 1);

        let response = table.dispatch("app", "app://x").unwrap();
        assert_eq!(response.body(), b"second");
    }

    #[test]
    fn test_unregistered_scheme_skips_handlers() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let mut table = SchemeTable::new();
        table.register(
            "app",
            Box::new(move |_: &str| {
                counter.set(counter.get() + 1);
                None
            }),
        );

        assert!(table.intercept(&ResourceRequest::new("https://example.com/")).is_none());
        assert!(table.intercept(&ResourceRequest::new("no-colon-here")).is_none());
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_handler_sees_full_uri() {
        let seen = Rc::new(std::cell::RefCell::new(String::new()));
        let sink = Rc::clone(&seen);
        let mut table = SchemeTable::new();
        table.register(
            "app",
            Box::new(move |uri: &str| {
                sink.borrow_mut().push_str(uri);
                Some(SchemeResponse::new(b"<h1>hi</h1>".to_vec(), "text/html"))
            }),
        );

        let response = table.intercept(&ResourceRequest::new("app://test/page")).unwrap();
        assert_eq!(&*seen.borrow(), "app://test/page");
        assert_eq!(response.status(), 200);
        assert_eq!(response.content_type(), Some("text/html"));
        assert_eq!(response.body(), b"<h1>hi</h1>");
    }

    #[test]
    fn test_missing_payload_or_content_type_defers() {
        let mut table = SchemeTable::new();
        table.register("none", Box::new(|_: &str| None));
        table.register("untyped", Box::new(|_: &str| Some(SchemeResponse::new(b"x".to_vec(), ""))));

        assert!(table.dispatch("none", "none:1").is_none());
        assert!(table.dispatch("untyped", "untyped:1").is_none());
    }
}
