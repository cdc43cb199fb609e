//! Anti-bot challenge detection over fixture pages

use jobscout::fetch::challenge::detect_str;

#[test]
fn cloudflare_interstitial_is_detected() {
    let html = r#"
        <html>
            <head><title>Just a moment...</title></head>
            <body><p>Checking your browser before accessing example.com</p></body>
        </html>
    "#;
    assert!(detect_str(html));
}

#[test]
fn body_text_markers_are_detected() {
    for marker in [
        "Security check",
        "Please prove you are human",
        "Verify you are human to continue",
        "Robot check",
        "We detected unusual traffic from your network",
        "Access denied",
    ] {
        let html = format!("<html><body><p>{marker}</p></body></html>");
        assert!(detect_str(&html), "marker not detected: {marker}");
    }
}

#[test]
fn challenge_iframes_are_detected() {
    for src in [
        "https://www.google.com/recaptcha/api2/anchor?k=x",
        "https://newassets.hcaptcha.com/captcha/v1/frame",
        "https://challenges.cloudflare.com/turnstile/v0",
        "https://content.imperva.com/frame",
    ] {
        let html = format!(r#"<html><body><iframe src="{src}"></iframe></body></html>"#);
        assert!(detect_str(&html), "iframe not detected: {src}");
    }
}

#[test]
fn challenge_form_actions_and_scripts_are_detected() {
    let form = r#"<html><body><form action="/cdn-cgi/challenge-platform/h/g"></form></body></html>"#;
    assert!(detect_str(form));

    let script = r#"<html><body><script src="https://static.distilnetworks.com/d.js"></script></body></html>"#;
    assert!(detect_str(script));
}

#[test]
fn ordinary_job_page_is_not_detected() {
    let html = r#"
        <html>
            <head><title>Software Engineer - Acme</title></head>
            <body>
                <h1>Open roles</h1>
                <div class="job"><h2>Customer Support Agent</h2></div>
            </body>
        </html>
    "#;
    assert!(!detect_str(html));
}
