pub mod driver;
pub mod guard;
pub mod mock;
pub mod types;
pub mod webdriver;

pub use driver::DriverService;
pub use guard::SessionGuard;
pub use mock::{CallLog, MockElement, MockPage, MockProvider, MockSession, SessionCall};
pub use types::{
    BrowserSession, ElementHandle, Locator, Point, Rect, SessionError, SessionProvider,
    SessionResult, Size, keys,
};
pub use webdriver::{WebDriverProvider, WebDriverSession, webdriver_runtime};
