//! Page-level stealth adjustments
//!
//! Registered as evaluate-on-new-document scripts so the overrides are in
//! place before any site script runs. These cover the checks job boards
//! actually make; full fingerprint spoofing is out of scope.

use anyhow::Result;
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetGeolocationOverrideParams, SetTimezoneOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::Page;
use tracing::debug;

/// Ordered evasion scripts. The webdriver flag is the first thing naive
/// detectors look at, so it goes first.
const EVASION_SCRIPTS: &[(&str, &str)] = &[
    (
        "navigator_webdriver",
        r"
        Object.defineProperty(navigator, 'webdriver', {
            get: () => false
        });
        ",
    ),
    (
        "navigator_languages",
        r"
        Object.defineProperty(navigator, 'languages', {
            get: () => ['en-US', 'en']
        });
        ",
    ),
    (
        "navigator_plugins",
        r"
        const mockPlugins = [
            {
                name: 'Chrome PDF Plugin',
                description: 'Portable Document Format',
                filename: 'internal-pdf-viewer'
            },
            {
                name: 'Chrome PDF Viewer',
                description: '',
                filename: 'mhjfbmdgcfjbbpaeojofohoefgiehjai'
            },
            {
                name: 'Native Client',
                description: '',
                filename: 'internal-nacl-plugin'
            }
        ];
        Object.defineProperty(navigator, 'plugins', {
            get: () => {
                const plugins = {};
                mockPlugins.forEach((plugin, i) => {
                    plugins[i] = plugin;
                    plugins[plugin.name] = plugin;
                });
                Object.defineProperty(plugins, 'length', { value: mockPlugins.length });
                return plugins;
            }
        });
        ",
    ),
    (
        "chrome_runtime",
        r"
        if (!window.chrome) {
            window.chrome = {};
        }
        if (!window.chrome.runtime) {
            window.chrome.runtime = {
                connect: () => ({
                    onMessage: { addListener: () => {}, removeListener: () => {} },
                    postMessage: () => {}
                })
            };
        }
        ",
    ),
    (
        "webgl_vendor",
        r"
        const getParameterProxyHandler = {
            apply: function(target, ctx, args) {
                const param = (args && args[0]) || null;
                if (param === 37445) {
                    return 'Intel Inc.';
                }
                if (param === 37446) {
                    return 'Intel Iris OpenGL Engine';
                }
                return Reflect.apply(target, ctx, args);
            }
        };
        if (window.WebGLRenderingContext) {
            const getParameter = WebGLRenderingContext.prototype.getParameter;
            WebGLRenderingContext.prototype.getParameter = new Proxy(getParameter, getParameterProxyHandler);
        }
        ",
    ),
];

/// Inject the evasion set into a page and strip the Headless marker from
/// its user agent. Call before the first navigation.
pub async fn inject(page: &Page) -> Result<()> {
    debug!("injecting {} stealth scripts", EVASION_SCRIPTS.len());

    for (name, source) in EVASION_SCRIPTS {
        page.execute(AddScriptToEvaluateOnNewDocumentParams {
            source: (*source).to_string(),
            include_command_line_api: None,
            world_name: None,
            run_immediately: None,
        })
        .await?;
        debug!(script = name, "stealth script registered");
    }

    // Pin timezone and geolocation to a plausible pair; a UTC headless
    // box with no geolocation is its own fingerprint.
    if let Ok(tz) = SetTimezoneOverrideParams::builder()
        .timezone_id("America/New_York")
        .build()
    {
        let _ = page.execute(tz).await;
    }
    let mut geo = SetGeolocationOverrideParams::default();
    geo.latitude = Some(40.730_610);
    geo.longitude = Some(-73.935_242);
    geo.accuracy = Some(1.0);
    let _ = page.execute(geo).await;

    let version = page
        .execute(chromiumoxide::cdp::browser_protocol::browser::GetVersionParams::default())
        .await?;
    let modified_ua = version.user_agent.replace("Headless", "");

    page.execute(SetUserAgentOverrideParams {
        user_agent: modified_ua,
        accept_language: Some("en-US,en;q=0.9".to_string()),
        platform: Some("Win32".to_string()),
        user_agent_metadata: None,
    })
    .await?;

    debug!("stealth injection complete");
    Ok(())
}
