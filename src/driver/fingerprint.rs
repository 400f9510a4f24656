//! Best-effort automation fingerprint softening
//!
//! A profile decides which Chrome switches a session starts with and which
//! script is installed to run before any page script.

const HIDE_WEBDRIVER: &str =
    "Object.defineProperty(navigator, 'webdriver', {get: () => undefined});";

const HARDENED_OVERRIDES: &str = r#"
window.navigator.chrome = { runtime: {} };
Object.defineProperty(navigator, 'platform', {get: () => 'Win32'});
Object.defineProperty(navigator, 'languages', {get: () => ['en-US', 'en']});
Object.defineProperty(navigator, 'plugins', {get: () => [1, 2, 3, 4, 5]});
"#;

/// Fingerprint profile for a browser session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FingerprintProfile {
    /// Quiet window, custom user agent, `navigator.webdriver` hidden
    #[default]
    Standard,
    /// Standard plus blink automation flag removal and navigator spoofing
    Hardened,
}

impl FingerprintProfile {
    /// Chrome command-line switches for this profile
    pub fn chrome_args(&self, user_agent: &str, headless: bool) -> Vec<String> {
        let mut args: Vec<String> = [
            "start-maximized",
            "disable-infobars",
            "--disable-extensions",
            "--disable-gpu",
            "--disable-dev-shm-usage",
            "--no-sandbox",
        ]
        .iter()
        .map(|arg| arg.to_string())
        .collect();

        if !user_agent.is_empty() {
            args.push(format!("--user-agent={}", user_agent));
        }

        if headless {
            args.push("--headless=new".to_string());
        }

        if *self == Self::Hardened {
            args.push("--disable-blink-features=AutomationControlled".to_string());
        }

        args
    }

    /// Script evaluated on every new document
    pub fn init_script(&self) -> String {
        match self {
            Self::Standard => HIDE_WEBDRIVER.to_string(),
            Self::Hardened => format!("{}\n{}", HIDE_WEBDRIVER, HARDENED_OVERRIDES.trim()),
        }
    }
}
