// Data models, request bodies and wire shapes

pub mod brotherhood;
pub mod bug_notification;
pub mod ebook;
pub mod email_template;
pub mod facebook_ads;
pub mod live_tracking;
pub mod login_log;
pub mod nutrition_plan;
pub mod prelaunch_package;
pub mod profile;
pub mod progress;
pub mod training_schema;
pub mod validation;
pub mod youtube;

pub use brotherhood::*;
pub use bug_notification::*;
pub use ebook::*;
pub use email_template::*;
pub use facebook_ads::*;
pub use live_tracking::*;
pub use login_log::*;
pub use nutrition_plan::*;
pub use prelaunch_package::*;
pub use profile::*;
pub use progress::*;
pub use training_schema::*;
pub use youtube::*;
