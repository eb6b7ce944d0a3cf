//! Script injected into every document before page scripts run.
//!
//! Exposes `window.external.sendMessage(text)` and
//! `window.external.receiveMessage(callback)` on top of the engine's native
//! `window.chrome.webview` channel.

pub const BOOTSTRAP_SCRIPT: &str = "\
window.external = {
    sendMessage: function (message) {
        window.chrome.webview.postMessage(message);
    },
    receiveMessage: function (callback) {
        window.chrome.webview.addEventListener('message', function (e) {
            callback(e.data);
        });
    }
};";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bootstrap_exposes_both_directions() {
        assert!(BOOTSTRAP_SCRIPT.contains("sendMessage"));
        assert!(BOOTSTRAP_SCRIPT.contains("receiveMessage"));
        assert!(BOOTSTRAP_SCRIPT.contains("postMessage"));
    }
}
