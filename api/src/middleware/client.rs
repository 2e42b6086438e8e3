//! What the request says about the client platform

use actix_web::http::header;
use actix_web::HttpRequest;

use ds_core::services::verification::PlatformCapabilities;
use ds_shared::platform::is_mobile_client;
use ds_shared::Language;

const CLIENT_HINT_MOBILE: &str = "sec-ch-ua-mobile";
const FORWARDED_PROTO: &str = "x-forwarded-proto";

fn header_str<'a>(req: &'a HttpRequest, name: impl header::AsHeaderName) -> Option<&'a str> {
    req.headers().get(name).and_then(|v| v.to_str().ok())
}

/// Preferred message language from `Accept-Language`
pub fn request_language(req: &HttpRequest) -> Language {
    header_str(req, header::ACCEPT_LANGUAGE)
        .map(Language::from_accept_language)
        .unwrap_or_default()
}

/// Mobile-class device per `Sec-CH-UA-Mobile` or `User-Agent`
pub fn is_mobile_request(req: &HttpRequest) -> bool {
    is_mobile_client(
        header_str(req, CLIENT_HINT_MOBILE),
        header_str(req, header::USER_AGENT),
    )
}

/// Whether the page that sent this request runs in a secure context
///
/// TLS connections and loopback hosts qualify. `X-Forwarded-Proto` is only
/// honoured behind a trusted proxy.
pub fn is_secure_request(req: &HttpRequest, trust_forwarded_proto: bool) -> bool {
    if req.app_config().secure() {
        return true;
    }
    if trust_forwarded_proto {
        let forwarded = header_str(req, FORWARDED_PROTO)
            .and_then(|v| v.split(',').next())
            .map(|proto| proto.trim().eq_ignore_ascii_case("https"))
            .unwrap_or(false);
        if forwarded {
            return true;
        }
    }
    header_str(req, header::HOST)
        .map(is_loopback_host)
        .unwrap_or(false)
}

fn is_loopback_host(host: &str) -> bool {
    let name = match host.rsplit_once(':') {
        Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host,
    };
    matches!(name, "localhost" | "127.0.0.1" | "[::1]")
}

/// Capabilities used to decide whether automatic code capture may start
pub fn platform_capabilities(
    req: &HttpRequest,
    otp_credential: bool,
    trust_forwarded_proto: bool,
) -> PlatformCapabilities {
    PlatformCapabilities {
        mobile: is_mobile_request(req),
        capture_facility: otp_credential,
        secure_context: is_secure_request(req, trust_forwarded_proto),
    }
}
