// Chat widget core: the ordered feed, the widget state machine, and the
// channel adapters that keep the feed in sync with a backend.

pub mod backend;
pub mod feed;
pub mod widget;

pub use backend::{backend_for, ChatBackend, ChannelHandle, RelayBackend, TableBackend};
pub use feed::{EntryView, MessageFeed};
pub use widget::{ChatWidget, WidgetView};
