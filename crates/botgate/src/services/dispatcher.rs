//! Dispatcher
//!
//! Orchestrates one inbound webhook event end to end:
//! parse → account resolution → service short-circuit → preprocessing →
//! menu/button routing → handler invocation → optional synchronous reply.
//!
//! Each inbound event is processed at most once and independently of other
//! events; per-account write safety is the account repository's contract.
//! Only parse/verification failures escape to the caller; every error
//! after a payload has been accepted is logged here and swallowed, because
//! messaging providers retry-storm on non-2xx webhook responses.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::domain::entities::{Account, AccountDefaults, Button, Menu, Message, Messenger};
use crate::domain::entities::MessageKind;
use crate::domain::errors::GatewayError;
use crate::ports::{AccountRepository, MenuRepository, MessengerAdapter};
use crate::registry::HandlerRegistry;
use crate::services::Outbox;

/// End-to-end processor for inbound webhook events.
pub struct Dispatcher {
    accounts: Arc<dyn AccountRepository>,
    menus: Arc<dyn MenuRepository>,
    registry: Arc<HandlerRegistry>,
}

impl Dispatcher {
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        menus: Arc<dyn MenuRepository>,
        registry: Arc<HandlerRegistry>,
    ) -> Self {
        Self {
            accounts,
            menus,
            registry,
        }
    }

    /// Process one raw webhook delivery for `messenger`.
    ///
    /// Returns the synchronous-reply envelope when the platform expects
    /// one (e.g. Viber's conversation-started response), None otherwise.
    /// Errors are limited to verification/parse failures and repository
    /// failures; adapter and handler errors are absorbed.
    pub async fn dispatch(
        &self,
        messenger: &Messenger,
        adapter: &dyn MessengerAdapter,
        body: &[u8],
        signature: Option<&str>,
    ) -> Result<Option<serde_json::Value>, GatewayError> {
        let message = adapter.parse_message(body, signature)?;
        debug!(
            platform = %messenger.platform,
            kind = message.kind.name(),
            message_id = ?message.id,
            user_id = ?message.user_id,
            "dispatching inbound message"
        );

        let mut account = None;
        if let Some(user_id) = message.user_id.clone() {
            let defaults = AccountDefaults {
                username: message.user_name.clone().or_else(|| Some(user_id.clone())),
                messenger_id: Some(messenger.id),
                menu_id: messenger.menu_id,
            };
            let (mut resolved, created) = self
                .accounts
                .get_or_create(messenger.platform, &user_id, defaults)
                .await?;
            if created || !resolved.has_profile() {
                self.refresh_profile(adapter, &mut resolved).await;
            }
            account = Some(resolved);
        }

        let menu = match account.as_ref().and_then(|a| a.menu_id) {
            Some(menu_id) => self.menus.find_by_id(menu_id).await?,
            None => None,
        };
        let outbox = Outbox::new(adapter, self.accounts.as_ref(), menu.as_ref());

        if message.is_service() {
            return self
                .handle_service(&message, messenger, account.as_ref(), adapter, &outbox)
                .await;
        }

        let Some(account) = account else {
            warn!(
                kind = message.kind.name(),
                "content message without a sender id; dropping"
            );
            return Ok(None);
        };

        let message = if adapter.needs_preprocessing() {
            adapter.preprocess_message(message, menu.as_ref())
        } else {
            message
        };

        if message.is_button() {
            self.route_button(&message, &account, menu.as_ref(), &outbox)
                .await?;
        } else if let Some(menu) = &menu {
            if let Some(handler_id) = &menu.handler {
                self.invoke_handler(handler_id, &message, &account, &outbox)
                    .await;
            }
        } else if !messenger.handler.is_empty() {
            self.invoke_handler(&messenger.handler, &message, &account, &outbox)
                .await;
        }

        Ok(None)
    }

    /// Service kinds never reach menu routing.
    async fn handle_service(
        &self,
        message: &Message,
        messenger: &Messenger,
        account: Option<&Account>,
        adapter: &dyn MessengerAdapter,
        outbox: &Outbox<'_>,
    ) -> Result<Option<serde_json::Value>, GatewayError> {
        match &message.kind {
            MessageKind::Start { .. } => {
                if let (Some(account), Some(welcome)) =
                    (account, messenger.welcome_text.as_deref())
                {
                    outbox.send(account, Message::text(welcome)).await;
                    return Ok(adapter.welcome_message(welcome));
                }
            }
            MessageKind::Unsubscribed => {
                if let Some(account) = account {
                    self.accounts.set_active(account.id, false).await?;
                    info!(
                        account_id = %account.id,
                        user = account.display_name(),
                        "account unsubscribed"
                    );
                }
            }
            MessageKind::Failed { text } => {
                warn!(error = ?text, "client reported failed delivery");
            }
            _ => {
                debug!(kind = message.kind.name(), "service event acknowledged");
            }
        }
        Ok(None)
    }

    /// Resolve a pressed button: current menu first, then the global
    /// button table. Exactly one match dispatches; zero or several is a
    /// known weak point and drops the event with a warning.
    async fn route_button(
        &self,
        message: &Message,
        account: &Account,
        menu: Option<&Menu>,
        outbox: &Outbox<'_>,
    ) -> Result<(), GatewayError> {
        let Some(command) = message.button_command() else {
            return Ok(());
        };

        let mut matched: Vec<Button> = menu
            .map(|m| m.find_matches(command).into_iter().cloned().collect())
            .unwrap_or_default();
        if matched.is_empty() {
            matched = self.menus.find_buttons_by_command_or_text(command).await?;
        }

        if matched.len() == 1 {
            self.activate_button(&matched[0], message, account, outbox)
                .await
        } else {
            warn!(
                matches = matched.len(),
                command,
                account_id = %account.id,
                "button match is ambiguous; dropping event"
            );
            Ok(())
        }
    }

    /// Run every configured effect of a pressed button, in order. The
    /// three steps are independent; a button may have any combination of
    /// a message, a next menu, and a handler.
    async fn activate_button(
        &self,
        button: &Button,
        message: &Message,
        account: &Account,
        outbox: &Outbox<'_>,
    ) -> Result<(), GatewayError> {
        debug!(
            command = %button.command,
            account_id = %account.id,
            "activating button"
        );

        if let Some(text) = &button.message {
            outbox.send(account, Message::text(text)).await;
        }

        if let Some(next_menu_id) = button.next_menu_id {
            self.accounts.set_menu(account.id, Some(next_menu_id)).await?;

            match self.menus.find_by_id(next_menu_id).await? {
                Some(next_menu) => {
                    let keyboard = next_menu.keyboard();
                    let greeting = match &next_menu.message {
                        Some(text) => Message::text(text).with_buttons(keyboard),
                        None => Message::keyboard(keyboard),
                    };
                    outbox.send(account, greeting).await;
                }
                None => {
                    error!(
                        menu_id = %next_menu_id,
                        command = %button.command,
                        "button points to a missing menu"
                    );
                }
            }
        }

        if let Some(handler_id) = &button.handler {
            self.invoke_handler(handler_id, message, account, outbox)
                .await;
        }

        Ok(())
    }

    /// Handler problems are configuration/bot-author errors: logged loudly,
    /// never fatal to the dispatch.
    async fn invoke_handler(
        &self,
        handler_id: &str,
        message: &Message,
        account: &Account,
        outbox: &Outbox<'_>,
    ) {
        match self.registry.resolve(handler_id) {
            Ok(handler) => {
                if let Err(error) = handler.handle(message, account, outbox).await {
                    error!(
                        handler = handler_id,
                        account_id = %account.id,
                        message_id = ?message.id,
                        %error,
                        "handler failed"
                    );
                }
            }
            Err(error) => {
                error!(handler = handler_id, %error, "configured handler is missing");
            }
        }
    }

    /// Fill the account profile from the provider. Throttling is a soft
    /// failure: the error lands in the info map for a later external retry
    /// and the dispatch continues without profile data.
    async fn refresh_profile(&self, adapter: &dyn MessengerAdapter, account: &mut Account) {
        match adapter.user_info(&account.user_id).await {
            Ok(profile) => {
                let username = profile.username.or_else(|| account.username.clone());
                let mut info = match profile.info {
                    serde_json::Value::Object(map) => serde_json::Value::Object(map),
                    _ => serde_json::json!({}),
                };
                if let Some(avatar) = profile.avatar {
                    info["avatar"] = serde_json::Value::String(avatar);
                }
                match self
                    .accounts
                    .set_profile(account.id, username.clone(), info.clone())
                    .await
                {
                    Ok(()) => {
                        account.username = username;
                        account.info = info;
                    }
                    Err(error) => {
                        warn!(account_id = %account.id, %error, "failed to store profile");
                    }
                }
            }
            Err(GatewayError::RateLimited(reason)) => {
                warn!(
                    account_id = %account.id,
                    %reason,
                    "profile lookup throttled; recorded for later retry"
                );
                let info = serde_json::json!({ "error": reason });
                if let Err(error) = self
                    .accounts
                    .set_profile(account.id, account.username.clone(), info.clone())
                    .await
                {
                    warn!(account_id = %account.id, %error, "failed to record throttle error");
                } else {
                    account.info = info;
                }
            }
            Err(error) => {
                warn!(account_id = %account.id, %error, "profile lookup failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use uuid::Uuid;

    use crate::domain::value_objects::{PlatformType, ProfileInfo};
    use crate::ports::SendOutcome;
    use crate::registry::MessageHandler;

    // --- In-memory test doubles ---

    #[derive(Default)]
    struct MemoryAccounts {
        accounts: Mutex<HashMap<(PlatformType, String), Account>>,
    }

    impl MemoryAccounts {
        fn get(&self, platform: PlatformType, user_id: &str) -> Option<Account> {
            self.accounts
                .lock()
                .unwrap()
                .get(&(platform, user_id.to_string()))
                .cloned()
        }

        fn update<F: FnOnce(&mut Account)>(&self, id: Uuid, f: F) -> Result<(), GatewayError> {
            let mut accounts = self.accounts.lock().unwrap();
            let account = accounts
                .values_mut()
                .find(|a| a.id == id)
                .ok_or_else(|| GatewayError::not_found("Account", id))?;
            f(account);
            Ok(())
        }
    }

    #[async_trait]
    impl AccountRepository for MemoryAccounts {
        async fn get_or_create(
            &self,
            platform: PlatformType,
            user_id: &str,
            defaults: AccountDefaults,
        ) -> Result<(Account, bool), GatewayError> {
            let mut accounts = self.accounts.lock().unwrap();
            let key = (platform, user_id.to_string());
            if let Some(existing) = accounts.get(&key) {
                return Ok((existing.clone(), false));
            }
            let mut account = Account::new(platform, user_id).with_menu(defaults.menu_id);
            account.username = defaults.username;
            account.messenger_id = defaults.messenger_id;
            accounts.insert(key, account.clone());
            Ok((account, true))
        }

        async fn find(
            &self,
            platform: PlatformType,
            user_id: &str,
        ) -> Result<Option<Account>, GatewayError> {
            Ok(self.get(platform, user_id))
        }

        async fn set_menu(&self, id: Uuid, menu_id: Option<Uuid>) -> Result<(), GatewayError> {
            self.update(id, |a| a.menu_id = menu_id)
        }

        async fn set_active(&self, id: Uuid, active: bool) -> Result<(), GatewayError> {
            self.update(id, |a| a.is_active = active)
        }

        async fn set_profile(
            &self,
            id: Uuid,
            username: Option<String>,
            info: serde_json::Value,
        ) -> Result<(), GatewayError> {
            self.update(id, |a| {
                a.username = username;
                a.info = info;
            })
        }

        async fn merge_context(
            &self,
            id: Uuid,
            patch: serde_json::Value,
        ) -> Result<(), GatewayError> {
            self.update(id, |a| {
                if let (Some(context), Some(patch)) = (a.context.as_object_mut(), patch.as_object())
                {
                    for (key, value) in patch {
                        context.insert(key.clone(), value.clone());
                    }
                }
            })
        }
    }

    #[derive(Default)]
    struct MemoryMenus {
        menus: HashMap<Uuid, Menu>,
    }

    impl MemoryMenus {
        fn with(menus: Vec<Menu>) -> Self {
            Self {
                menus: menus.into_iter().map(|m| (m.id, m)).collect(),
            }
        }
    }

    #[async_trait]
    impl MenuRepository for MemoryMenus {
        async fn find_by_id(&self, id: Uuid) -> Result<Option<Menu>, GatewayError> {
            Ok(self.menus.get(&id).cloned())
        }

        async fn find_buttons_by_command_or_text(
            &self,
            needle: &str,
        ) -> Result<Vec<Button>, GatewayError> {
            let mut found = Vec::new();
            for menu in self.menus.values() {
                for button in menu.find_matches(needle) {
                    if !found.iter().any(|b: &Button| b.id == button.id) {
                        found.push(button.clone());
                    }
                }
            }
            Ok(found)
        }
    }

    struct MockAdapter {
        parse_result: Message,
        preprocessing: bool,
        sent: Mutex<Vec<Message>>,
        send_error: Mutex<Option<GatewayError>>,
        user_info: Mutex<Option<Result<ProfileInfo, GatewayError>>>,
        welcome_envelope: Option<serde_json::Value>,
    }

    impl MockAdapter {
        fn returning(parse_result: Message) -> Self {
            Self {
                parse_result,
                preprocessing: false,
                sent: Mutex::new(Vec::new()),
                send_error: Mutex::new(None),
                user_info: Mutex::new(None),
                welcome_envelope: None,
            }
        }

        fn with_preprocessing(mut self) -> Self {
            self.preprocessing = true;
            self
        }

        fn with_welcome_envelope(mut self, envelope: serde_json::Value) -> Self {
            self.welcome_envelope = Some(envelope);
            self
        }

        fn fail_sends_with(self, error: GatewayError) -> Self {
            *self.send_error.lock().unwrap() = Some(error);
            self
        }

        fn with_user_info(self, result: Result<ProfileInfo, GatewayError>) -> Self {
            *self.user_info.lock().unwrap() = Some(result);
            self
        }

        fn sent_messages(&self) -> Vec<Message> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MessengerAdapter for MockAdapter {
        fn platform(&self) -> PlatformType {
            PlatformType::Telegram
        }

        async fn enable_webhook(&self, _url: &str) -> Result<(), GatewayError> {
            Ok(())
        }

        async fn disable_webhook(&self) -> Result<(), GatewayError> {
            Ok(())
        }

        async fn account_info(&self) -> Result<ProfileInfo, GatewayError> {
            Ok(ProfileInfo::default())
        }

        async fn user_info(&self, user_id: &str) -> Result<ProfileInfo, GatewayError> {
            match self.user_info.lock().unwrap().take() {
                Some(result) => result,
                None => Ok(ProfileInfo::new(user_id, Some("tester".into()))),
            }
        }

        fn parse_message(
            &self,
            _body: &[u8],
            _signature: Option<&str>,
        ) -> Result<Message, GatewayError> {
            Ok(self.parse_result.clone())
        }

        fn needs_preprocessing(&self) -> bool {
            self.preprocessing
        }

        fn preprocess_message(&self, message: Message, menu: Option<&Menu>) -> Message {
            if !message.is_text() {
                return message;
            }
            let Some(menu) = menu else {
                return message;
            };
            let text = message.text_content().unwrap_or_default().to_string();
            let command = menu
                .buttons
                .iter()
                .find(|b| b.is_active && b.text == text)
                .map(|b| b.command.clone());
            match command {
                Some(command) => message.promote_to_button(command),
                None => message,
            }
        }

        async fn send_message(&self, _receiver: &str, messages: Vec<Message>) -> SendOutcome {
            if let Some(error) = self.send_error.lock().unwrap().take() {
                return SendOutcome::failed(Vec::new(), error);
            }
            let mut sent = self.sent.lock().unwrap();
            let ids = (0..messages.len())
                .map(|i| format!("sent-{}", sent.len() + i))
                .collect();
            sent.extend(messages);
            SendOutcome::ok(ids)
        }

        fn welcome_message(&self, _text: &str) -> Option<serde_json::Value> {
            self.welcome_envelope.clone()
        }
    }

    #[derive(Default)]
    struct RecordingHandler {
        calls: Mutex<Vec<Message>>,
    }

    impl RecordingHandler {
        fn calls(&self) -> Vec<Message> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MessageHandler for RecordingHandler {
        async fn handle(
            &self,
            message: &Message,
            _account: &Account,
            _outbox: &Outbox<'_>,
        ) -> Result<(), GatewayError> {
            self.calls.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    fn dispatcher_with(
        accounts: Arc<MemoryAccounts>,
        menus: MemoryMenus,
        registry: HandlerRegistry,
    ) -> Dispatcher {
        Dispatcher::new(accounts, Arc::new(menus), Arc::new(registry))
    }

    fn messenger() -> Messenger {
        Messenger::new("Support", PlatformType::Telegram, "123:abc")
    }

    // --- Tests ---

    #[tokio::test]
    async fn test_start_with_welcome_short_circuits_routing() {
        let accounts = Arc::new(MemoryAccounts::default());
        let fallback = Arc::new(RecordingHandler::default());
        let mut registry = HandlerRegistry::new();
        registry.register("test.fallback", fallback.clone());

        let messenger = messenger()
            .with_welcome_text("Welcome aboard!")
            .with_handler("test.fallback");
        let adapter = MockAdapter::returning(Message::start(None).with_user("42"))
            .with_welcome_envelope(serde_json::json!({ "type": "text", "text": "Welcome aboard!" }));

        let dispatcher = dispatcher_with(accounts.clone(), MemoryMenus::default(), registry);
        let reply = dispatcher
            .dispatch(&messenger, &adapter, b"{}", None)
            .await
            .unwrap();

        assert_eq!(
            reply,
            Some(serde_json::json!({ "type": "text", "text": "Welcome aboard!" }))
        );
        let sent = adapter.sent_messages();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].text_content(), Some("Welcome aboard!"));
        assert!(fallback.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unsubscribed_deactivates_account_without_routing() {
        let accounts = Arc::new(MemoryAccounts::default());
        let messenger = messenger();
        let adapter = MockAdapter::returning(Message::unsubscribed().with_user("42"));

        let dispatcher = dispatcher_with(
            accounts.clone(),
            MemoryMenus::default(),
            HandlerRegistry::new(),
        );
        let reply = dispatcher
            .dispatch(&messenger, &adapter, b"{}", None)
            .await
            .unwrap();

        assert_eq!(reply, None);
        let account = accounts.get(PlatformType::Telegram, "42").unwrap();
        assert!(!account.is_active);
        assert!(adapter.sent_messages().is_empty());
    }

    #[tokio::test]
    async fn test_text_matching_button_routes_to_that_button_only() {
        let orders_handler = Arc::new(RecordingHandler::default());
        let help_handler = Arc::new(RecordingHandler::default());
        let mut registry = HandlerRegistry::new();
        registry.register("test.orders", orders_handler.clone());
        registry.register("test.help", help_handler.clone());

        let b1 = Button::new("Orders", "Orders").with_handler("test.orders");
        let b2 = Button::new("Help", "Help").with_handler("test.help");
        let menu = Menu::new("Home").with_buttons(vec![b1, b2.clone()]);
        let messenger = messenger().with_root_menu(menu.id);

        let adapter = MockAdapter::returning(
            Message::text("Help").with_id("m1").with_user("42"),
        )
        .with_preprocessing();

        let dispatcher = dispatcher_with(
            Arc::new(MemoryAccounts::default()),
            MemoryMenus::with(vec![menu]),
            registry,
        );
        dispatcher
            .dispatch(&messenger, &adapter, b"{}", None)
            .await
            .unwrap();

        let calls = help_handler.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].button_command(), Some(b2.command.as_str()));
        assert!(orders_handler.calls().is_empty());
    }

    #[tokio::test]
    async fn test_ambiguous_global_match_drops_event() {
        let handler = Arc::new(RecordingHandler::default());
        let mut registry = HandlerRegistry::new();
        registry.register("test.shared", handler.clone());

        // Two buttons share display text in two menus the account is not on.
        let shared_a = Button::new("Shared A", "Same").with_handler("test.shared");
        let shared_b = Button::new("Shared B", "Same").with_handler("test.shared");
        let menu_a = Menu::new("A").with_buttons(vec![shared_a]);
        let menu_b = Menu::new("B").with_buttons(vec![shared_b]);
        let current = Menu::new("Current");
        let messenger = messenger().with_root_menu(current.id);

        let adapter = MockAdapter::returning(Message::button("Same").with_user("42"));

        let dispatcher = dispatcher_with(
            Arc::new(MemoryAccounts::default()),
            MemoryMenus::with(vec![menu_a, menu_b, current]),
            registry,
        );
        let reply = dispatcher
            .dispatch(&messenger, &adapter, b"{}", None)
            .await
            .unwrap();

        assert_eq!(reply, None);
        assert!(handler.calls().is_empty());
        assert!(adapter.sent_messages().is_empty());
    }

    #[tokio::test]
    async fn test_global_fallback_finds_unique_button() {
        let handler = Arc::new(RecordingHandler::default());
        let mut registry = HandlerRegistry::new();
        registry.register("test.global", handler.clone());

        let elsewhere = Button::new("Elsewhere", "Elsewhere").with_handler("test.global");
        let other_menu = Menu::new("Other").with_buttons(vec![elsewhere]);
        let current = Menu::new("Current");
        let messenger = messenger().with_root_menu(current.id);

        let adapter = MockAdapter::returning(Message::button("Elsewhere").with_user("42"));

        let dispatcher = dispatcher_with(
            Arc::new(MemoryAccounts::default()),
            MemoryMenus::with(vec![other_menu, current]),
            registry,
        );
        dispatcher
            .dispatch(&messenger, &adapter, b"{}", None)
            .await
            .unwrap();

        assert_eq!(handler.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_text_without_menu_reaches_messenger_fallback() {
        let fallback = Arc::new(RecordingHandler::default());
        let mut registry = HandlerRegistry::new();
        registry.register("test.fallback", fallback.clone());

        let messenger = messenger().with_handler("test.fallback");
        // Canonical form of the Telegram fixture:
        // {"message":{"message_id":1,"from":{"id":42},"text":"Hello","date":1700000000}}
        let adapter = MockAdapter::returning(
            Message::text("Hello")
                .with_id("1")
                .with_user("42")
                .with_timestamp(1700000000)
                .with_platform(PlatformType::Telegram),
        );

        let dispatcher = dispatcher_with(
            Arc::new(MemoryAccounts::default()),
            MemoryMenus::default(),
            registry,
        );
        dispatcher
            .dispatch(&messenger, &adapter, b"{}", None)
            .await
            .unwrap();

        let calls = fallback.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].text_content(), Some("Hello"));
        assert_eq!(calls[0].user_id.as_deref(), Some("42"));
        assert_eq!(calls[0].timestamp, Some(1700000000));
    }

    #[tokio::test]
    async fn test_menu_without_handler_ignores_free_text() {
        let fallback = Arc::new(RecordingHandler::default());
        let mut registry = HandlerRegistry::new();
        registry.register("test.fallback", fallback.clone());

        let menu = Menu::new("Quiet");
        let messenger = messenger()
            .with_root_menu(menu.id)
            .with_handler("test.fallback");
        let adapter = MockAdapter::returning(Message::text("anything").with_user("42"));

        let dispatcher = dispatcher_with(
            Arc::new(MemoryAccounts::default()),
            MemoryMenus::with(vec![menu]),
            registry,
        );
        dispatcher
            .dispatch(&messenger, &adapter, b"{}", None)
            .await
            .unwrap();

        // The messenger fallback applies only when there is no current menu.
        assert!(fallback.calls().is_empty());
    }

    #[tokio::test]
    async fn test_button_activation_runs_all_three_steps() {
        let handler = Arc::new(RecordingHandler::default());
        let mut registry = HandlerRegistry::new();
        registry.register("test.pressed", handler.clone());

        let sub_button = Button::new("Back", "Back");
        let next_menu = Menu::new("Submenu")
            .with_message("You reached the submenu")
            .with_buttons(vec![sub_button.clone()]);
        let button = Button::new("Go", "Go")
            .with_message("Moving you along")
            .with_next_menu(next_menu.id)
            .with_handler("test.pressed");
        let home = Menu::new("Home").with_buttons(vec![button.clone()]);
        let messenger = messenger().with_root_menu(home.id);

        let accounts = Arc::new(MemoryAccounts::default());
        let adapter = MockAdapter::returning(
            Message::button(button.command.clone()).with_user("42"),
        );

        let dispatcher = dispatcher_with(
            accounts.clone(),
            MemoryMenus::with(vec![home, next_menu.clone()]),
            registry,
        );
        dispatcher
            .dispatch(&messenger, &adapter, b"{}", None)
            .await
            .unwrap();

        let sent = adapter.sent_messages();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].text_content(), Some("Moving you along"));
        assert_eq!(sent[1].text_content(), Some("You reached the submenu"));
        let keyboard = sent[1].buttons.as_ref().unwrap();
        assert_eq!(keyboard.len(), 1);
        assert_eq!(keyboard[0].command, sub_button.command);

        let account = accounts.get(PlatformType::Telegram, "42").unwrap();
        assert_eq!(account.menu_id, Some(next_menu.id));
        assert_eq!(handler.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_next_menu_without_greeting_sends_bare_keyboard() {
        let next_button = Button::new("Pick me", "Pick me");
        let next_menu = Menu::new("Bare").with_buttons(vec![next_button.clone()]);
        let button = Button::new("Go", "Go").with_next_menu(next_menu.id);
        let home = Menu::new("Home").with_buttons(vec![button.clone()]);
        let messenger = messenger().with_root_menu(home.id);

        let adapter = MockAdapter::returning(
            Message::button(button.command.clone()).with_user("42"),
        );
        let dispatcher = dispatcher_with(
            Arc::new(MemoryAccounts::default()),
            MemoryMenus::with(vec![home, next_menu]),
            HandlerRegistry::new(),
        );
        dispatcher
            .dispatch(&messenger, &adapter, b"{}", None)
            .await
            .unwrap();

        let sent = adapter.sent_messages();
        assert_eq!(sent.len(), 1);
        assert!(matches!(sent[0].kind, MessageKind::Keyboard));
        assert_eq!(sent[0].buttons.as_ref().unwrap()[0].text, "Pick me");
    }

    #[tokio::test]
    async fn test_unknown_handler_is_logged_not_fatal() {
        let button = Button::new("Broken", "Broken").with_handler("missing.handler");
        let home = Menu::new("Home").with_buttons(vec![button.clone()]);
        let messenger = messenger().with_root_menu(home.id);

        let adapter = MockAdapter::returning(
            Message::button(button.command.clone()).with_user("42"),
        );
        let dispatcher = dispatcher_with(
            Arc::new(MemoryAccounts::default()),
            MemoryMenus::with(vec![home]),
            HandlerRegistry::new(),
        );

        let result = dispatcher.dispatch(&messenger, &adapter, b"{}", None).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_not_subscribed_send_deactivates_account() {
        let button = Button::new("Hi", "Hi").with_message("hello there");
        let home = Menu::new("Home").with_buttons(vec![button.clone()]);
        let messenger = messenger().with_root_menu(home.id);

        let accounts = Arc::new(MemoryAccounts::default());
        let adapter = MockAdapter::returning(
            Message::button(button.command.clone()).with_user("42"),
        )
        .fail_sends_with(GatewayError::NotSubscribed);

        let dispatcher = dispatcher_with(
            accounts.clone(),
            MemoryMenus::with(vec![home]),
            HandlerRegistry::new(),
        );
        dispatcher
            .dispatch(&messenger, &adapter, b"{}", None)
            .await
            .unwrap();

        let account = accounts.get(PlatformType::Telegram, "42").unwrap();
        assert!(!account.is_active);
    }

    #[tokio::test]
    async fn test_rate_limited_profile_lookup_is_recorded_and_soft() {
        let fallback = Arc::new(RecordingHandler::default());
        let mut registry = HandlerRegistry::new();
        registry.register("test.fallback", fallback.clone());

        let messenger = messenger().with_handler("test.fallback");
        let accounts = Arc::new(MemoryAccounts::default());
        let adapter = MockAdapter::returning(Message::text("hi").with_user("42"))
            .with_user_info(Err(GatewayError::RateLimited(
                "failed with status: 12".into(),
            )));

        let dispatcher = dispatcher_with(accounts.clone(), MemoryMenus::default(), registry);
        dispatcher
            .dispatch(&messenger, &adapter, b"{}", None)
            .await
            .unwrap();

        let account = accounts.get(PlatformType::Telegram, "42").unwrap();
        assert_eq!(
            account.info.get("error").and_then(|v| v.as_str()),
            Some("failed with status: 12")
        );
        // Dispatch still reached the fallback handler.
        assert_eq!(fallback.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_disjoint_updates_both_persist() {
        let accounts = Arc::new(MemoryAccounts::default());
        let (account, _) = accounts
            .get_or_create(
                PlatformType::Viber,
                "user=",
                AccountDefaults::default(),
            )
            .await
            .unwrap();

        let menu_id = Uuid::new_v4();
        let a = accounts.clone();
        let b = accounts.clone();
        let id = account.id;
        let menu_task =
            tokio::spawn(async move { a.set_menu(id, Some(menu_id)).await });
        let context_task = tokio::spawn(async move {
            b.merge_context(id, serde_json::json!({ "x": 1 })).await
        });
        menu_task.await.unwrap().unwrap();
        context_task.await.unwrap().unwrap();

        let account = accounts.get(PlatformType::Viber, "user=").unwrap();
        assert_eq!(account.menu_id, Some(menu_id));
        assert_eq!(account.context.get("x"), Some(&serde_json::json!(1)));
    }
}
