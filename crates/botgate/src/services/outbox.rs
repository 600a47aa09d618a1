//! Outbox
//!
//! Outbound capability scoped to one dispatch: sends canonical messages to
//! an account through its platform adapter, attaches the current menu's
//! keyboard, and absorbs delivery errors so a failed send never aborts the
//! inbound flow.

use tracing::{error, warn};

use crate::domain::entities::{Account, Menu, Message};
use crate::domain::errors::GatewayError;
use crate::ports::{AccountRepository, MessengerAdapter};

/// Sending capability handed to handlers and used for button activation.
pub struct Outbox<'a> {
    adapter: &'a dyn MessengerAdapter,
    accounts: &'a dyn AccountRepository,
    /// The account's current menu, used to keep its keyboard visible on
    /// replies that carry no keyboard of their own.
    menu: Option<&'a Menu>,
}

impl<'a> Outbox<'a> {
    pub fn new(
        adapter: &'a dyn MessengerAdapter,
        accounts: &'a dyn AccountRepository,
        menu: Option<&'a Menu>,
    ) -> Self {
        Self {
            adapter,
            accounts,
            menu,
        }
    }

    /// Send `message` to `account`, returning the delivered message ids.
    ///
    /// A `Multiple` message is flattened and delivered in order; partial
    /// delivery keeps whatever was already sent. `NotSubscribed` clears
    /// the account's active flag; every other delivery error is logged
    /// and swallowed.
    pub async fn send(&self, account: &Account, message: Message) -> Vec<String> {
        let message = self.attach_menu_keyboard(message);
        let outcome = self
            .adapter
            .send_message(&account.user_id, message.into_list())
            .await;

        if let Some(error) = outcome.error {
            match error {
                GatewayError::NotSubscribed => {
                    warn!(
                        account_id = %account.id,
                        user = account.display_name(),
                        "receiver is not subscribed; deactivating account"
                    );
                    if let Err(error) = self.accounts.set_active(account.id, false).await {
                        error!(account_id = %account.id, %error, "failed to deactivate account");
                    }
                }
                error => {
                    error!(
                        platform = %self.adapter.platform(),
                        account_id = %account.id,
                        delivered = outcome.delivered.len(),
                        %error,
                        "outbound send failed"
                    );
                }
            }
        }

        outcome.delivered
    }

    fn attach_menu_keyboard(&self, message: Message) -> Message {
        if message.buttons.is_some() {
            return message;
        }
        match self.menu {
            Some(menu) if !menu.keyboard().is_empty() => message.with_buttons(menu.keyboard()),
            _ => message,
        }
    }
}
