//! Integration tests for the dashboard-core render pipeline.
//!
//! Raw frames go in through `Dispatcher::process_frame` exactly as the client
//! receives them; assertions are made on the resulting `DashboardView`.

use dashboard_core::protocol::payload::{decode_markup, encode_markup};
use dashboard_core::protocol::stomp::{decode_frame, StompCommand};
use dashboard_core::render::timestamp::TimestampZone;
use dashboard_core::{
    AllowList, AllowListSanitizer, DashboardView, DecodeError, Dispatcher, HtmlSanitizer,
    ReceiverId, RenderConfig, RenderError, RenderOutcome, RenderTarget, ServerLink,
};

fn setup() -> (Dispatcher, DashboardView) {
    let dispatcher = Dispatcher::new(RenderConfig {
        timestamp_zone: TimestampZone::Utc,
        ..RenderConfig::default()
    });
    let view = dispatcher.new_view();
    (dispatcher, view)
}

fn card_payload(view: &DashboardView, id: &str) -> String {
    view.card(&ReceiverId::new(id))
        .and_then(|card| card.rendered_payload.as_ref())
        .map(|html| html.as_str().to_string())
        .unwrap_or_default()
}

// ── Reference scenarios ───────────────────────────────────────────────────────

#[test]
fn test_plain_text_frame_renders_on_card() {
    let (d, mut view) = setup();

    let outcome = d.process_frame(
        &mut view,
        r#"{"contentType":"text/plain","data":"42"}"#,
        Some("card-1"),
    );

    assert_eq!(
        outcome,
        RenderOutcome::Rendered {
            target: RenderTarget::Card("card-1".into())
        }
    );
    assert_eq!(card_payload(&view, "card-1"), "<p>42</p>");
    assert!(view.banner().message().is_none());
}

#[test]
fn test_json_frame_with_bad_body_falls_back_to_text() {
    let (d, mut view) = setup();

    let outcome = d.process_frame(
        &mut view,
        r#"{"contentType":"application/json","data":"{not json"}"#,
        Some("card-1"),
    );

    assert!(matches!(
        outcome.error(),
        Some(RenderError::Decode(DecodeError::InvalidJson(_)))
    ));
    assert_eq!(card_payload(&view, "card-1"), "<p>{not json</p>");
    assert!(view.banner().message().is_none());
}

#[test]
fn test_markup_frame_to_root_fills_surface() {
    let (d, mut view) = setup();
    let frame = format!(
        r#"{{"contentType":"text/html;base64","data":"{}"}}"#,
        encode_markup("<b>hi</b>")
    );

    d.process_frame(&mut view, &frame, Some("dashboard"));

    assert_eq!(view.surface().content.as_ref().unwrap().as_str(), "<b>hi</b>");
    assert_eq!(view.card_count(), 0);
}

#[test]
fn test_unknown_type_frame_shows_error_on_card_and_banner() {
    let (d, mut view) = setup();
    let revision_before = view.banner().revision();

    d.process_frame(
        &mut view,
        r#"{"contentType":"weird/type","data":"x"}"#,
        Some("card-1"),
    );

    assert!(card_payload(&view, "card-1").contains("Incorrect payload type"));
    assert_eq!(view.banner().revision(), revision_before + 1);
}

// ── Server-originated frames ──────────────────────────────────────────────────

#[test]
fn test_server_style_frame_with_type_key_and_string_timestamp() {
    let (d, mut view) = setup();

    d.process_frame(
        &mut view,
        r#"{"type":"TEXT/PLAIN","data":"on","timestamp":"3723000"}"#,
        Some("lamp"),
    );

    let card = view.card(&"lamp".into()).unwrap();
    assert_eq!(card.last_timestamp.as_deref(), Some("01:02:03"));
    assert_eq!(card_payload(&view, "lamp"), "<p>on</p>");
}

#[test]
fn test_stomp_message_to_view() {
    // Arrange: a MESSAGE frame as the broker sends it
    let (d, mut view) = setup();
    let body = r#"{"type":"application/json","data":"{\"name\":\"Humidity\",\"status\":\"ok\",\"data\":\"55%\"}"}"#;
    let wire = format!("MESSAGE\nsubscription:sub-0\ncard:card7\ncontent-length:{}\n\n{body}\0", body.len());

    // Act
    let (frame, _) = decode_frame(&wire).unwrap().unwrap();
    let outcome = d.process_frame(&mut view, &frame.body, frame.header("card"));

    // Assert
    assert_eq!(frame.command, StompCommand::Message);
    assert!(outcome.is_rendered());
    let card = view.card(&"card7".into()).unwrap();
    assert_eq!(card.last_text.as_ref().unwrap().as_str(), "Humidity");
    assert_eq!(card_payload(&view, "card7"), "<p>55%</p>");
}

#[test]
fn test_frame_without_receiver_is_dropped() {
    let (d, mut view) = setup();

    let outcome = d.process_frame(&mut view, r#"{"type":"text/plain","data":"x"}"#, None);

    assert!(matches!(outcome, RenderOutcome::Dropped { .. }));
    assert_eq!(view.card_count(), 0);
}

#[test]
fn test_connect_reply_then_card_updates() {
    let (d, mut view) = setup();
    let start = format!(
        r#"{{"name":"onConnect","status":"ok","type":"text/html;base64","data":"{}"}}"#,
        encode_markup(r#"<div class="card" id="card1"><h5>Lamp</h5></div>"#)
    );
    let connect_frame = serde_json::json!({ "type": "application/json", "data": start }).to_string();

    d.process_frame(&mut view, &connect_frame, Some("card1"));
    d.process_frame(&mut view, r#"{"type":"text/plain","data":"off"}"#, Some("card1"));

    assert_eq!(view.surface().server_link, ServerLink::Up);
    assert!(view.surface().content.as_ref().unwrap().as_str().contains("<h5>Lamp</h5>"));
    assert_eq!(card_payload(&view, "card1"), "<p>off</p>");
}

// ── Injection ─────────────────────────────────────────────────────────────────

const INJECTIONS: &[&str] = &[
    "<script>alert(1)</script>",
    "<img src=x onerror=alert(1)>",
    "<svg onload=alert(1)><path d='M0'/></svg>",
    r#"<a href="javascript:alert(1)">x</a>"#,
    "<iframe src=//evil></iframe>",
    r#"<div style="background:url(x)" onmouseover="x()">y</div>"#,
    "<<script>script>alert(1)<</script>/script>",
];

/// Every tag left in `html` must be allowed and carry no handler, script URL
/// or inline style.
fn assert_clean(html: &str) {
    let policy = AllowList::default();
    for tag in html.split('<').skip(1) {
        let tag = tag.split('>').next().unwrap_or_default().to_ascii_lowercase();
        let name: String = tag
            .trim_start_matches('/')
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect();
        assert!(policy.allows_tag(&name), "tag {name:?} survived in {html:?}");
        for needle in [" on", "javascript:", "style="] {
            assert!(!tag.contains(needle), "{needle:?} survived in {html:?}");
        }
    }
}

#[test]
fn test_markup_injection_is_neutralized() {
    let (d, mut view) = setup();
    for (i, payload) in INJECTIONS.iter().enumerate() {
        let id = format!("card{i}");
        let frame = format!(
            r#"{{"type":"text/html;base64","data":"{}"}}"#,
            encode_markup(payload)
        );
        d.process_frame(&mut view, &frame, Some(&id));
        assert_clean(&card_payload(&view, &id));
    }
}

#[test]
fn test_plain_text_injection_is_neutralized() {
    let (d, mut view) = setup();
    for (i, payload) in INJECTIONS.iter().enumerate() {
        let id = format!("text{i}");
        let frame = serde_json::json!({ "type": "text/plain", "data": payload }).to_string();
        d.process_frame(&mut view, &frame, Some(&id));
        assert_clean(&card_payload(&view, &id));
    }
}

#[test]
fn test_structured_injection_is_neutralized() {
    let (d, mut view) = setup();
    for payload in INJECTIONS {
        let inner = serde_json::json!({ "name": payload, "status": payload, "data": payload }).to_string();
        let frame = serde_json::json!({ "type": "application/json", "data": inner }).to_string();

        d.process_frame(&mut view, &frame, Some("card"));

        let card = view.card(&"card".into()).unwrap();
        assert_clean(card.last_text.as_ref().unwrap().as_str());
        assert_clean(card.last_status.as_ref().unwrap().as_str());
        assert_clean(&card_payload(&view, "card"));
    }
}

#[test]
fn test_sanitizer_output_only_contains_allowed_tags() {
    let policy = AllowList::default();
    for payload in INJECTIONS {
        assert_clean(&AllowListSanitizer.sanitize(payload, &policy));
    }
}

// ── Markup codec ──────────────────────────────────────────────────────────────

#[test]
fn test_markup_encode_decode_preserves_utf8() {
    for html in ["", "<p>plain</p>", "<b>Grüße</b> 😀", "line\nbreak\ttab"] {
        assert_eq!(decode_markup(&encode_markup(html)).unwrap(), html);
    }
}
