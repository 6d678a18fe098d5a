//! xdg-desktop-portal Screenshot requests.

use super::types::{CaptureError, CaptureType};
use futures::StreamExt;
use std::collections::HashMap;
use zbus::zvariant::{OwnedValue, Value};
use zbus::{Connection, proxy};

#[proxy(
    interface = "org.freedesktop.portal.Screenshot",
    default_service = "org.freedesktop.portal.Desktop",
    default_path = "/org/freedesktop/portal/desktop"
)]
trait Screenshot {
    /// Returns the object path of the Request that will carry the result.
    async fn screenshot(
        &self,
        parent_window: &str,
        options: HashMap<String, Value<'_>>,
    ) -> zbus::Result<zbus::zvariant::OwnedObjectPath>;
}

#[proxy(
    interface = "org.freedesktop.portal.Request",
    default_service = "org.freedesktop.portal.Desktop"
)]
trait Request {
    /// `response`: 0 success, 1 cancelled by the user, 2 other error.
    #[zbus(signal)]
    fn response(&self, response: u32, results: HashMap<String, OwnedValue>) -> zbus::Result<()>;
}

/// Asks the portal for a screenshot and returns the `file://` URI it wrote.
pub async fn capture_via_portal(capture_type: CaptureType) -> Result<String, CaptureError> {
    log::debug!("Requesting portal screenshot: {:?}", capture_type);

    let connection = Connection::session().await?;
    let proxy = ScreenshotProxy::new(&connection).await?;
    let request_path = proxy
        .screenshot("", build_portal_options(capture_type))
        .await?;

    let request = RequestProxy::builder(&connection)
        .path(request_path)?
        .build()
        .await?;
    let mut responses = request.receive_response().await?;

    let signal = responses
        .next()
        .await
        .ok_or_else(|| CaptureError::InvalidResponse("No Response signal received".into()))?;
    let args = signal
        .args()
        .map_err(|e| CaptureError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

    interpret_response(args.response, &args.results)
}

fn interpret_response(
    code: u32,
    results: &HashMap<String, OwnedValue>,
) -> Result<String, CaptureError> {
    match code {
        0 => {
            let uri = results
                .get("uri")
                .ok_or_else(|| CaptureError::InvalidResponse("No 'uri' field in response".into()))?;
            let uri: &str = uri
                .downcast_ref()
                .map_err(|e| CaptureError::InvalidResponse(format!("URI is not a string: {}", e)))?;
            log::info!("Portal screenshot captured: {}", uri);
            Ok(uri.to_string())
        }
        1 => Err(CaptureError::Cancelled("portal dialog dismissed".into())),
        other => Err(CaptureError::InvalidResponse(format!(
            "Portal returned error code {}",
            other
        ))),
    }
}

/// The portal cannot target a single window or region without its own picker,
/// so everything except the full screen runs interactively.
fn build_portal_options(capture_type: CaptureType) -> HashMap<String, Value<'static>> {
    let mut options = HashMap::new();
    options.insert("modal".to_string(), false.into());
    options.insert(
        "interactive".to_string(),
        (capture_type != CaptureType::FullScreen).into(),
    );
    options
}
