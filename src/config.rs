use std::fmt;

/// Storage record holding every sheet.
pub const SHEETS_KEY: &str = "sheets";
/// Storage record holding every tag definition.
pub const TAGS_KEY: &str = "allTags";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Vendor {
    Firefox,
    Chrome,
    Unknown,
}

impl Vendor {
    /// Some user agents carry both names, so "Firefox" has to win.
    pub fn from_user_agent(user_agent: &str) -> Self {
        if user_agent.contains("Firefox") {
            Vendor::Firefox
        } else if user_agent.contains("Chrome") {
            Vendor::Chrome
        } else {
            Vendor::Unknown
        }
    }

    pub fn storage_flavor(self) -> StorageFlavor {
        match self {
            Vendor::Firefox => StorageFlavor::Promise,
            Vendor::Chrome | Vendor::Unknown => StorageFlavor::Callback,
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Vendor::Firefox => "Firefox",
            Vendor::Chrome => "Chrome",
            Vendor::Unknown => "Unknown",
        })
    }
}

/// Which extension storage API a vendor is served by.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageFlavor {
    /// `browser.storage.local`, promise based.
    Promise,
    /// `chrome.storage.local`, callback based with `chrome.runtime.lastError`.
    Callback,
}

/// Host environment, resolved once at startup and handed to the app.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtensionEnv {
    pub user_agent: String,
    pub vendor: Vendor,
}

impl ExtensionEnv {
    pub fn from_user_agent(user_agent: impl Into<String>) -> Self {
        let user_agent = user_agent.into();
        let vendor = Vendor::from_user_agent(&user_agent);
        Self { user_agent, vendor }
    }

    pub fn detect() -> Self {
        let user_agent = web_sys::window()
            .and_then(|window| window.navigator().user_agent().ok())
            .unwrap_or_default();
        let env = Self::from_user_agent(user_agent);
        log::debug!("Browser type: {}", env.vendor);
        env
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIREFOX_UA: &str =
        "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";
    const CHROME_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

    #[test]
    fn firefox_wins_over_chrome() {
        assert_eq!(Vendor::from_user_agent(FIREFOX_UA), Vendor::Firefox);
        assert_eq!(
            Vendor::from_user_agent("Mozilla/5.0 Chrome/120.0 Firefox/121.0"),
            Vendor::Firefox
        );
        assert_eq!(Vendor::Firefox.storage_flavor(), StorageFlavor::Promise);
    }

    #[test]
    fn chrome_uses_callback_storage() {
        assert_eq!(Vendor::from_user_agent(CHROME_UA), Vendor::Chrome);
        assert_eq!(Vendor::Chrome.storage_flavor(), StorageFlavor::Callback);
    }

    #[test]
    fn unknown_falls_back_to_callback_storage() {
        let env = ExtensionEnv::from_user_agent("curl/8.5.0");
        assert_eq!(env.vendor, Vendor::Unknown);
        assert_eq!(env.vendor.storage_flavor(), StorageFlavor::Callback);
        assert_eq!(ExtensionEnv::from_user_agent("").vendor, Vendor::Unknown);
    }
}
