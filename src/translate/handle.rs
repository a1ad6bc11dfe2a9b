//! `handle.*` directives: handlers placed before the upstream dispatch.

use crate::document::{Handler, StaticResponseHandler};
use crate::labels::{Directive, DirectiveBundle};

/// Pre-handlers in chain order. `handle.abort` yields a static response
/// that aborts the request; the value `false` switches it off.
pub fn translate_handle(bundle: &DirectiveBundle) -> Vec<Handler> {
    let mut handlers = Vec::new();

    if let Some(value) = bundle.first(Directive::HandleAbort) {
        if value.trim().eq_ignore_ascii_case("false") {
            tracing::debug!("handle.abort switched off");
        } else {
            handlers.push(Handler::StaticResponse(StaticResponseHandler {
                abort: true,
                ..StaticResponseHandler::default()
            }));
        }
    }

    handlers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abort() {
        let bundle = DirectiveBundle::new().with("handle.abort", "");
        let handlers = translate_handle(&bundle);
        assert_eq!(handlers.len(), 1);
        assert!(matches!(
            &handlers[0],
            Handler::StaticResponse(StaticResponseHandler { abort: true, .. })
        ));
    }

    #[test]
    fn test_abort_off_and_absent() {
        let off = DirectiveBundle::new().with("handle.abort", "false");
        assert!(translate_handle(&off).is_empty());
        assert!(translate_handle(&DirectiveBundle::new()).is_empty());
    }
}
