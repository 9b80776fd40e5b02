//! The diary's single state container.
//!
//! All state lives here and is only touched from the event loop. Backend
//! calls run as spawned tasks and report back through [`AppEvent`]s, so the
//! loop never waits on them and several writes may be in flight at once.

use crate::auth::User;
use crate::blob_store::{image_path, BlobStore};
use crate::config::Config;
use crate::delete_flow::{DeleteConfirmation, DeleteTarget};
use crate::diary_entry::{DiaryEntry, DiaryImage, EntryId, EntryPatch, UserId, WriteToken};
use crate::diary_state::DiaryState;
use crate::entry_store::EntryList;
use crate::error::{AuthError, BlobError, StoreError, SuggestError};
use crate::image_placement::ImagePlacementController;
use crate::layout::{BookLayout, CellScale, ImagePart};
use crate::pagination::{FlipDirection, PageStride, PaginationController};
use crate::password_gate::PasswordGate;
use crate::services::Services;
use crate::tag_suggestions::{suggest_tags, TagSuggestions};
use crate::text_input::{InputResult, TextInput};
use crate::toast::Toasts;
use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use futures::StreamExt;
use log::{debug, info, warn};
use ratatui::layout::Rect;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use uuid::Uuid;

const SAVED_NOTICE: Duration = Duration::from_millis(1500);
const CURSOR_BLINK: Duration = Duration::from_millis(500);
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp", "svg"];

/// Results of backend calls, delivered back to the event loop.
#[derive(Debug)]
pub enum AppEvent {
    Snapshot {
        user: UserId,
        entries: EntryList,
    },
    SubscribeFailed(StoreError),
    SignedIn(Result<User, AuthError>),
    SignedOut(Result<(), AuthError>),
    Created(Result<EntryId, StoreError>),
    Saved {
        entry: EntryId,
        token: WriteToken,
        result: Result<(), StoreError>,
    },
    Deleted {
        entry: EntryId,
        result: Result<(), StoreError>,
    },
    Uploaded {
        entry: EntryId,
        result: Result<String, BlobError>,
    },
    BlobReleased(Result<(), BlobError>),
    Suggested {
        entry: EntryId,
        result: Result<Vec<String>, SuggestError>,
    },
}

/// Actions that ask for the password first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtectedAction {
    UploadImage { entry: EntryId, path: PathBuf },
    DeleteImage { entry: EntryId, image: Uuid },
    SaveTags { entry: EntryId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoginField {
    #[default]
    Email,
    Password,
}

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: TextInput,
    pub password: TextInput,
    pub field: LoginField,
    pub busy: bool,
}

impl LoginForm {
    fn new() -> Self {
        LoginForm {
            password: TextInput::default().masked(),
            ..Default::default()
        }
    }
}

pub enum Screen {
    Loading,
    Login(LoginForm),
    Diary,
}

pub enum Mode {
    Browse,
    EditTitle { entry: EntryId, input: TextInput },
    EditContent { entry: EntryId, input: TextInput },
    ImagePath { entry: EntryId, input: TextInput },
}

pub struct App {
    services: Services,
    tx: UnboundedSender<AppEvent>,
    flip_delay: Duration,
    narrow_width: u16,
    pub scale: CellScale,
    pub screen: Screen,
    pub user: Option<User>,
    subscription: Option<JoinHandle<()>>,
    pub state: DiaryState,
    pub pages: PaginationController,
    pub placement: ImagePlacementController,
    pub deletion: DeleteConfirmation,
    pub gate: PasswordGate<ProtectedAction>,
    pub password_input: TextInput,
    pub suggestions: TagSuggestions,
    pub toasts: Toasts,
    pub mode: Mode,
    pub layout: BookLayout,
    /// Page slot of the spread that keyboard commands act on.
    pub focus: usize,
    pub book_open: bool,
    pub saving: usize,
    pub saved_at: Option<Instant>,
    pub cursor_visible: bool,
    last_cursor_update: Instant,
    pub should_quit: bool,
}

impl App {
    pub fn new(services: Services, config: &Config, tx: UnboundedSender<AppEvent>) -> Self {
        App {
            services,
            tx,
            flip_delay: config.flip_delay(),
            narrow_width: config.narrow_width,
            scale: CellScale::new(config.cell_width, config.cell_height),
            screen: Screen::Loading,
            user: None,
            subscription: None,
            state: DiaryState::new(),
            pages: PaginationController::new(config.flip_delay()),
            placement: ImagePlacementController::default(),
            deletion: DeleteConfirmation::default(),
            gate: PasswordGate::new(config.action_password_sha256.clone()),
            password_input: TextInput::default().masked(),
            suggestions: TagSuggestions::default(),
            toasts: Toasts::default(),
            mode: Mode::Browse,
            layout: BookLayout::default(),
            focus: 0,
            book_open: false,
            saving: 0,
            saved_at: None,
            cursor_visible: true,
            last_cursor_update: Instant::now(),
            should_quit: false,
        }
    }

    fn spawn<F>(&self, task: F)
    where
        F: Future<Output = AppEvent> + Send + 'static,
    {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            // The loop is gone when this fails; nothing is left to notify.
            let _ = tx.send(task.await);
        });
    }

    fn user_id(&self) -> Option<UserId> {
        self.user.as_ref().map(|u| u.id.clone())
    }

    fn refresh_pages(&mut self, now: Instant) {
        self.pages.on_entries_changed(self.state.entries(), now);
    }

    pub fn focused_entry(&self) -> Option<&DiaryEntry> {
        self.pages
            .visible_pages()
            .get(self.focus)
            .copied()
            .flatten()
    }

    fn focused_entry_id(&self) -> Option<EntryId> {
        self.focused_entry().map(|e| e.id.clone())
    }

    pub fn is_saved_notice_visible(&self) -> bool {
        self.saved_at.is_some()
    }

    // ---- session ----

    pub fn on_session(&mut self, user: Option<User>) {
        match user {
            Some(user) if self.user.as_ref() == Some(&user) => {}
            Some(user) => self.start_diary(user),
            None => self.end_session(),
        }
    }

    fn start_diary(&mut self, user: User) {
        self.stop_subscription();
        self.reset_diary();
        info!("Opening diary of {}", user.email);

        let store = self.services.entries.clone();
        let tx = self.tx.clone();
        let uid = user.id.clone();
        self.subscription = Some(tokio::spawn(async move {
            let feed = match store.subscribe(uid.clone()).await {
                Ok(feed) => feed,
                Err(e) => {
                    let _ = tx.send(AppEvent::SubscribeFailed(e));
                    return;
                }
            };
            let mut snapshots = Box::pin(feed.into_stream());
            while let Some(entries) = snapshots.next().await {
                let event = AppEvent::Snapshot {
                    user: uid.clone(),
                    entries,
                };
                if tx.send(event).is_err() {
                    break;
                }
            }
        }));

        self.user = Some(user);
        self.screen = Screen::Diary;
    }

    fn end_session(&mut self) {
        self.stop_subscription();
        self.reset_diary();
        self.user = None;
        self.screen = Screen::Login(LoginForm::new());
    }

    fn stop_subscription(&mut self) {
        if let Some(task) = self.subscription.take() {
            debug!("Unsubscribing from entry feed");
            task.abort();
        }
    }

    fn reset_diary(&mut self) {
        let stride = self.pages.stride();
        self.state = DiaryState::new();
        self.pages = PaginationController::new(self.flip_delay);
        self.pages.set_stride(stride);
        self.placement = ImagePlacementController::default();
        self.deletion.cancel();
        self.gate.cancel();
        self.password_input.clear();
        self.suggestions.clear();
        self.mode = Mode::Browse;
        self.focus = 0;
        self.book_open = false;
        self.saved_at = None;
    }

    fn sign_out(&mut self) {
        let auth = self.services.auth.clone();
        self.spawn(async move { AppEvent::SignedOut(auth.sign_out().await) });
    }

    /// Releases everything tied to the signed-in user.
    pub fn shutdown(&mut self) {
        self.stop_subscription();
    }

    // ---- backend results ----

    pub fn handle_app_event(&mut self, event: AppEvent, now: Instant) {
        match event {
            AppEvent::Snapshot { user, entries } => {
                if self.user_id().as_ref() != Some(&user) {
                    debug!("Ignoring snapshot for signed-out user {}", user);
                    return;
                }
                self.state.apply_snapshot(entries);
                self.refresh_pages(now);
            }
            AppEvent::SubscribeFailed(e) => {
                self.toasts
                    .error("Could not load diary", e.to_string());
            }
            AppEvent::SignedIn(result) => {
                if let Screen::Login(form) = &mut self.screen {
                    form.busy = false;
                }
                if let Err(e) = result {
                    self.toasts.error("Sign-in Failed", e.to_string());
                }
            }
            AppEvent::SignedOut(result) => {
                if let Err(e) = result {
                    warn!("Error signing out: {}", e);
                    self.toasts.error("Sign-out Failed", e.to_string());
                }
            }
            AppEvent::Created(Ok(id)) => self.pages.on_entry_created(id, now),
            AppEvent::Created(Err(e)) => {
                self.toasts.error("New Page Failed", e.to_string());
            }
            AppEvent::Saved {
                entry,
                token,
                result,
            } => {
                self.saving = self.saving.saturating_sub(1);
                match result {
                    Ok(()) => self.saved_at = Some(now),
                    Err(StoreError::NotFound(_)) => {
                        debug!("Entry {} was gone before the save landed", entry);
                    }
                    Err(e) => {
                        self.state.write_failed(&entry, token);
                        self.toasts.error("Save Failed", e.to_string());
                    }
                }
            }
            AppEvent::Deleted { entry, result } => match result {
                Ok(()) | Err(StoreError::NotFound(_)) => debug!("Entry {} deleted", entry),
                Err(e) => {
                    // The page index stays where the confirm put it.
                    self.pages.on_delete_failed(&entry);
                    self.toasts.error("Delete Failed", e.to_string());
                }
            },
            AppEvent::Uploaded { entry, result } => match result {
                Ok(url) => self.attach_image(entry, url, now),
                Err(e) => {
                    warn!("Error uploading image: {}", e);
                    self.toasts
                        .error("Upload Failed", "There was an error uploading your image.");
                }
            },
            AppEvent::BlobReleased(Err(e)) => {
                warn!("Error deleting image blob: {}", e);
                self.toasts.error(
                    "Image Deletion Failed",
                    "The image may have already been deleted.",
                );
            }
            AppEvent::BlobReleased(Ok(())) => {}
            AppEvent::Suggested { entry, result } => match result {
                Ok(tags) => {
                    if tags.is_empty() {
                        self.toasts.info("No new tags", "Nothing new to suggest.");
                    }
                    self.suggestions.finish(&entry, Some(tags));
                }
                Err(SuggestError::EmptyContent) => {
                    self.suggestions.finish(&entry, None);
                    self.toasts.error(
                        "Cannot suggest tags",
                        SuggestError::EmptyContent.to_string(),
                    );
                }
                Err(e) => {
                    warn!("Failed to suggest tags: {}", e);
                    self.suggestions.finish(&entry, None);
                    self.toasts.error(
                        "AI Error",
                        "Could not generate tag suggestions at this time.",
                    );
                }
            },
        }
    }

    // ---- entry operations ----

    fn new_entry(&mut self) {
        let Some(user) = self.user_id() else {
            return;
        };
        let store = self.services.entries.clone();
        self.spawn(async move { AppEvent::Created(store.create(user).await) });
    }

    fn save_entry(&mut self, id: &EntryId) {
        if let Some(patch) = self.state.commit(id) {
            self.persist(id.clone(), patch);
        }
    }

    fn persist(&mut self, entry: EntryId, patch: EntryPatch) {
        let (Some(user), Some(token)) = (self.user_id(), patch.write_token) else {
            return;
        };
        self.saving += 1;
        let store = self.services.entries.clone();
        self.spawn(async move {
            let result = store.update(user, entry.clone(), patch).await;
            AppEvent::Saved {
                entry,
                token,
                result,
            }
        });
    }

    fn delete_entry(&mut self, entry: EntryId) {
        let Some(user) = self.user_id() else {
            return;
        };
        let store = self.services.entries.clone();
        self.spawn(async move {
            let result = store.delete(user, entry.clone()).await;
            AppEvent::Deleted { entry, result }
        });
    }

    fn attach_image(&mut self, entry: EntryId, url: String, now: Instant) {
        let image = DiaryImage::new(url.clone());
        if !self.state.edit(&entry, |e| e.images.push(image)) {
            warn!("Entry {} vanished during upload; releasing {}", entry, url);
            let blobs = self.services.blobs.clone();
            self.spawn(async move { AppEvent::BlobReleased(blobs.delete(url).await) });
            return;
        }
        self.save_entry(&entry);
        self.refresh_pages(now);
        self.toasts.success("Image added", "Drag it into place on the page.");
    }

    fn request_suggestions(&mut self) {
        if self.suggestions.is_loading() {
            debug!("Tag suggestions already in progress");
            return;
        }
        let Some(entry) = self.focused_entry().cloned() else {
            return;
        };
        if entry.content.trim().is_empty() {
            self.toasts.error(
                "Cannot suggest tags",
                SuggestError::EmptyContent.to_string(),
            );
            return;
        }
        self.suggestions.start(entry.id.clone());
        let tags = self.services.tags.clone();
        self.spawn(async move {
            let result = suggest_tags(tags.as_ref(), entry.content, &entry.tags).await;
            AppEvent::Suggested {
                entry: entry.id,
                result,
            }
        });
    }

    fn add_suggested_tag(&mut self, index: usize, now: Instant) {
        let Some(id) = self.focused_entry_id() else {
            return;
        };
        let Some(tag) = self.suggestions.take(&id, index) else {
            return;
        };
        let mut added = false;
        self.state.edit(&id, |e| added = e.add_tag(&tag));
        self.refresh_pages(now);
        if added {
            self.request_protected(ProtectedAction::SaveTags { entry: id }, now);
        }
    }

    fn request_upload(&mut self, entry: EntryId, raw_path: &str, now: Instant) {
        let path = PathBuf::from(raw_path.trim());
        let is_image = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
        if !is_image {
            self.toasts
                .error("Not an image", format!("{} is not an image file.", path.display()));
            return;
        }
        self.request_protected(ProtectedAction::UploadImage { entry, path }, now);
    }

    // ---- password protected actions ----

    fn request_protected(&mut self, action: ProtectedAction, now: Instant) {
        if let Some(action) = self.gate.request(action) {
            self.run_protected(action, now);
        }
    }

    fn run_protected(&mut self, action: ProtectedAction, now: Instant) {
        match action {
            ProtectedAction::UploadImage { entry, path } => {
                let Some(user) = self.user_id() else {
                    return;
                };
                let blobs = self.services.blobs.clone();
                info!("Starting image upload of {}", path.display());
                self.spawn(async move {
                    let result = upload_image(blobs.as_ref(), &user, &entry, &path).await;
                    AppEvent::Uploaded { entry, result }
                });
            }
            ProtectedAction::DeleteImage { entry, image } => {
                let Some((patch, removed)) = self.placement.delete(&entry, image, &mut self.state)
                else {
                    return;
                };
                self.persist(entry, patch);
                self.refresh_pages(now);
                let blobs = self.services.blobs.clone();
                self.spawn(async move { AppEvent::BlobReleased(blobs.delete(removed.src).await) });
            }
            ProtectedAction::SaveTags { entry } => self.save_entry(&entry),
        }
    }

    // ---- time ----

    pub fn tick(&mut self, now: Instant) {
        self.pages.tick(now);
        self.toasts.prune(now);
        if self
            .saved_at
            .is_some_and(|at| now.saturating_duration_since(at) >= SAVED_NOTICE)
        {
            self.saved_at = None;
        }
        if now.saturating_duration_since(self.last_cursor_update) >= CURSOR_BLINK {
            self.cursor_visible = !self.cursor_visible;
            self.last_cursor_update = now;
        }
    }

    pub fn on_resize(&mut self, area: Rect) {
        let stride = if area.width < self.narrow_width {
            PageStride::Single
        } else {
            PageStride::Double
        };
        self.pages.set_stride(stride);
        self.focus = self.focus.min(stride.get() - 1);
        self.layout = BookLayout::compute(area, stride);
    }

    // ---- input ----

    pub fn handle_terminal_event(&mut self, event: Event, now: Instant) {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key(key, now),
            Event::Mouse(mouse) => self.handle_mouse(mouse, now),
            Event::Resize(width, height) => self.on_resize(Rect::new(0, 0, width, height)),
            _ => {}
        }
    }

    fn handle_key(&mut self, key: KeyEvent, now: Instant) {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }
        match self.screen {
            Screen::Loading => {
                if key.code == KeyCode::Char('q') {
                    self.should_quit = true;
                }
            }
            Screen::Login(_) => self.handle_login_key(key),
            Screen::Diary => self.handle_diary_key(key, now),
        }
    }

    fn handle_login_key(&mut self, key: KeyEvent) {
        let Screen::Login(form) = &mut self.screen else {
            return;
        };
        if form.busy {
            return;
        }
        let submit = match (key.code, form.field) {
            (KeyCode::Esc, _) => {
                self.should_quit = true;
                return;
            }
            (KeyCode::Tab | KeyCode::Down | KeyCode::Up | KeyCode::BackTab, field) => {
                form.field = match field {
                    LoginField::Email => LoginField::Password,
                    LoginField::Password => LoginField::Email,
                };
                false
            }
            (KeyCode::Enter, LoginField::Email) => {
                form.field = LoginField::Password;
                false
            }
            (KeyCode::Enter, LoginField::Password) => true,
            (_, LoginField::Email) => {
                form.email.handle_key(key);
                false
            }
            (_, LoginField::Password) => {
                form.password.handle_key(key);
                false
            }
        };
        if !submit {
            return;
        }

        let email = form.email.value().to_string();
        let password = form.password.value().to_string();
        form.password.clear();
        form.busy = true;
        let auth = self.services.auth.clone();
        self.spawn(async move { AppEvent::SignedIn(auth.sign_in(email, password).await) });
    }

    fn handle_diary_key(&mut self, key: KeyEvent, now: Instant) {
        if self.gate.is_prompting() {
            self.handle_password_key(key, now);
            return;
        }
        if self.deletion.pending().is_some() {
            self.handle_confirm_key(key, now);
            return;
        }

        match std::mem::replace(&mut self.mode, Mode::Browse) {
            Mode::Browse => self.handle_browse_key(key, now),
            Mode::EditTitle { entry, mut input } => match input.handle_key(key) {
                InputResult::Submitted | InputResult::Left => self.save_entry(&entry),
                result => {
                    if result == InputResult::Edited {
                        let title = input.value().to_string();
                        self.state.edit(&entry, |e| e.title = title);
                        self.refresh_pages(now);
                    }
                    self.mode = Mode::EditTitle { entry, input };
                }
            },
            Mode::EditContent { entry, mut input } => match input.handle_key(key) {
                InputResult::Submitted | InputResult::Left => self.save_entry(&entry),
                result => {
                    if result == InputResult::Edited {
                        let content = input.value().to_string();
                        self.state.edit(&entry, |e| e.content = content);
                        self.refresh_pages(now);
                    }
                    self.mode = Mode::EditContent { entry, input };
                }
            },
            Mode::ImagePath { entry, mut input } => match input.handle_key(key) {
                InputResult::Submitted => self.request_upload(entry, input.value(), now),
                InputResult::Left => {}
                _ => self.mode = Mode::ImagePath { entry, input },
            },
        }
    }

    fn handle_password_key(&mut self, key: KeyEvent, now: Instant) {
        match self.password_input.handle_key(key) {
            InputResult::Submitted => {
                let outcome = self.gate.submit(self.password_input.value());
                self.password_input.clear();
                match outcome {
                    Ok(Some(action)) => self.run_protected(action, now),
                    Ok(None) => {}
                    Err(e) => self.toasts.error("Incorrect Password", e.to_string()),
                }
            }
            InputResult::Left => {
                self.gate.cancel();
                self.password_input.clear();
            }
            _ => {}
        }
    }

    fn handle_confirm_key(&mut self, key: KeyEvent, now: Instant) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                match self.deletion.confirm(&mut self.pages) {
                    Some(DeleteTarget::Entry(id)) => self.delete_entry(id),
                    Some(DeleteTarget::Image { entry, image }) => {
                        self.request_protected(ProtectedAction::DeleteImage { entry, image }, now)
                    }
                    None => {}
                }
            }
            KeyCode::Char('n') | KeyCode::Esc => self.deletion.cancel(),
            _ => {}
        }
    }

    fn handle_browse_key(&mut self, key: KeyEvent, now: Instant) {
        if !self.book_open {
            match key.code {
                KeyCode::Enter | KeyCode::Char(' ') => self.book_open = true,
                KeyCode::Char('o') => self.sign_out(),
                KeyCode::Char('q') => self.should_quit = true,
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('x') => self.book_open = false,
            KeyCode::Char('o') => self.sign_out(),
            KeyCode::Left | KeyCode::Char('h') => {
                if self.pages.can_flip_back() {
                    self.pages.flip(FlipDirection::Backward, now);
                }
            }
            KeyCode::Right | KeyCode::Char('l') => {
                if self.pages.can_flip_forward() {
                    self.pages.flip(FlipDirection::Forward, now);
                }
            }
            KeyCode::Tab => {
                self.focus = (self.focus + 1) % self.pages.stride().get();
            }
            KeyCode::Char('n') => self.new_entry(),
            KeyCode::Char('t') => {
                if let Some(entry) = self.focused_entry() {
                    self.mode = Mode::EditTitle {
                        entry: entry.id.clone(),
                        input: TextInput::new(&entry.title),
                    };
                }
            }
            KeyCode::Char('c') => {
                if let Some(entry) = self.focused_entry() {
                    self.mode = Mode::EditContent {
                        entry: entry.id.clone(),
                        input: TextInput::new(&entry.content).multiline(),
                    };
                }
            }
            KeyCode::Char('s') => {
                if let Some(id) = self.focused_entry_id() {
                    self.save_entry(&id);
                }
            }
            KeyCode::Char('d') => {
                if let Some(id) = self.focused_entry_id() {
                    self.deletion.request(DeleteTarget::Entry(id));
                }
            }
            KeyCode::Char('i') => {
                if let Some(id) = self.focused_entry_id() {
                    self.mode = Mode::ImagePath {
                        entry: id,
                        input: TextInput::default(),
                    };
                }
            }
            KeyCode::Char('g') => self.request_suggestions(),
            KeyCode::Char(c @ '1'..='9') => {
                let index = c as usize - '1' as usize;
                self.add_suggested_tag(index, now);
            }
            _ => {}
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent, now: Instant) {
        if !matches!(self.screen, Screen::Diary) {
            return;
        }
        let pointer = self.scale.pointer(mouse.column, mouse.row);
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => self.pointer_down(mouse.column, mouse.row),
            MouseEventKind::Drag(MouseButton::Left) => {
                if self.placement.pointer_moved(pointer, &mut self.state) {
                    self.refresh_pages(now);
                }
            }
            MouseEventKind::Up(MouseButton::Left) => {
                if let Some((entry, patch)) = self.placement.pointer_released(&mut self.state) {
                    self.persist(entry, patch);
                    self.refresh_pages(now);
                }
            }
            _ => {}
        }
    }

    fn pointer_down(&mut self, column: u16, row: u16) {
        let idle = matches!(self.mode, Mode::Browse)
            && !self.gate.is_prompting()
            && self.deletion.pending().is_none();
        if !self.book_open || !idle {
            return;
        }
        let Some(slot) = self.layout.slot_at(column, row) else {
            return;
        };
        self.focus = slot;
        let (Some(page), Some(entry)) = (self.layout.page_inner(slot), self.focused_entry().cloned())
        else {
            return;
        };

        for image in entry.images.iter().rev() {
            let cells = self.scale.image_cells(page, image);
            let visible = cells.clip(page).is_some_and(|r| {
                column >= r.x && column < r.x + r.width && row >= r.y && row < r.y + r.height
            });
            if !visible {
                continue;
            }
            match cells.part_at(column, row) {
                Some(ImagePart::ResizeHandle) => {
                    self.placement
                        .begin_resize(entry.id.clone(), image, self.scale.origin(page));
                }
                Some(ImagePart::DeleteHandle) => {
                    self.deletion.request(DeleteTarget::Image {
                        entry: entry.id.clone(),
                        image: image.id,
                    });
                }
                Some(ImagePart::Body) => {
                    let pointer = self.scale.pointer(column, row);
                    self.placement.begin_drag(entry.id.clone(), image, pointer);
                }
                None => continue,
            }
            return;
        }
    }
}

async fn upload_image(
    blobs: &dyn BlobStore,
    user: &UserId,
    entry: &EntryId,
    path: &Path,
) -> Result<String, BlobError> {
    let bytes = tokio::fs::read(path).await?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    blobs.upload(image_path(user, entry, &name), bytes).await
}
