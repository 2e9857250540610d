//! Explorer state: catalog paging, the character detail view, the AI panel,
//! semantic search and notes.
//!
//! All mutation happens on the event loop. Network calls run on spawned
//! tasks and report back through [`AppEvent`]s, which the loop feeds into
//! [`Explorer::handle_event`].

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::backend::{BackendClient, BackendError, SearchResponse};
use crate::catalog::{CatalogClient, CatalogError};
use crate::models::{CatalogPage, Character, DialogueResult, Location, Note, NoteId, SearchResult};
use crate::narrator::{Narrator, SpeechEvent};
use crate::notes::NotesBook;

/// Completion of a background request.
#[derive(Debug)]
pub enum AppEvent {
    CatalogLoaded {
        page: u32,
        result: Result<CatalogPage, CatalogError>,
    },
    NotesLoaded {
        character_id: String,
        result: Result<Vec<Note>, BackendError>,
    },
    NoteSaved {
        character_id: String,
        result: Result<Vec<Note>, BackendError>,
    },
    NoteDeleted {
        character_id: String,
        note_id: NoteId,
        result: Result<(), BackendError>,
    },
    DialogueReady {
        character_id: String,
        result: DialogueResult,
    },
    SearchFinished {
        query: String,
        response: SearchResponse,
    },
}

pub struct Explorer {
    catalog: Arc<CatalogClient>,
    backend: Arc<BackendClient>,
    events: mpsc::UnboundedSender<AppEvent>,
    narrator: Narrator,

    page: u32,
    total_pages: u32,
    has_next: bool,
    locations: Vec<Location>,
    loading: bool,
    error: Option<String>,

    selected: Option<Character>,
    ai_result: Option<DialogueResult>,
    ai_loading: bool,
    script_collapsed: bool,
    note_input: String,
    notes: NotesBook,

    search_query: String,
    searching: bool,
    search_result: Option<SearchResult>,
}

impl Explorer {
    pub fn new(
        catalog: Arc<CatalogClient>,
        backend: Arc<BackendClient>,
        narrator: Narrator,
        events: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            catalog,
            backend,
            events,
            narrator,
            page: 1,
            total_pages: 1,
            has_next: false,
            locations: Vec::new(),
            loading: false,
            error: None,
            selected: None,
            ai_result: None,
            ai_loading: false,
            script_collapsed: false,
            note_input: String::new(),
            notes: NotesBook::new(),
            search_query: String::new(),
            searching: false,
            search_result: None,
        }
    }

    // --- Catalog ---

    /// Request a catalog page (clamped to 1 or more).
    pub fn load_page(&mut self, page: u32) {
        let page = page.max(1);
        self.page = page;
        self.loading = true;
        self.error = None;

        let catalog = self.catalog.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = catalog.fetch_locations(page).await;
            let _ = events.send(AppEvent::CatalogLoaded { page, result });
        });
    }

    pub fn next_page(&mut self) {
        if self.has_next {
            self.load_page(self.page + 1);
        }
    }

    pub fn prev_page(&mut self) {
        if self.page > 1 {
            self.load_page(self.page - 1);
        }
    }

    fn on_catalog_loaded(&mut self, page: u32, result: Result<CatalogPage, CatalogError>) {
        if page != self.page {
            debug!("Dropping catalog page {page}, page {} is current", self.page);
            return;
        }
        self.loading = false;

        match result {
            Ok(data) => {
                info!(
                    "Loaded catalog page {page}/{} ({} locations)",
                    data.total_pages,
                    data.locations.len()
                );
                self.locations = data.locations;
                self.total_pages = data.total_pages;
                self.has_next = data.has_next;
            }
            Err(e) => {
                warn!("Catalog page {page} failed: {e}");
                self.error = Some(e.user_message().to_string());
                self.locations.clear();
            }
        }
    }

    // --- Detail view ---

    /// Open `character`, discarding everything shown for the previous one.
    pub fn select_character(&mut self, character: Character) {
        self.narrator.reset();
        self.ai_result = None;
        self.ai_loading = false;
        self.note_input.clear();

        info!("Opened character {} ({})", character.id, character.name);
        let character_id = character.id.clone();
        self.selected = Some(character);

        let backend = self.backend.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = backend.get_notes(&character_id).await;
            let _ = events.send(AppEvent::NotesLoaded {
                character_id,
                result,
            });
        });
    }

    /// Open a character shown on screen, search results first.
    pub fn select_by_id(&mut self, id: &str) -> bool {
        let found = self
            .search_result
            .iter()
            .flat_map(|r| r.results.iter())
            .chain(self.locations.iter().flat_map(|l| l.residents.iter()))
            .find(|c| c.id == id)
            .cloned();

        match found {
            Some(character) => {
                self.select_character(character);
                true
            }
            None => false,
        }
    }

    pub fn close_detail(&mut self) {
        self.narrator.reset();
        self.selected = None;
        self.ai_result = None;
        self.ai_loading = false;
        self.note_input.clear();
    }

    pub fn toggle_script(&mut self) {
        self.script_collapsed = !self.script_collapsed;
    }

    // --- AI panel ---

    pub fn generate(&mut self) {
        if self.ai_loading {
            return;
        }
        let Some(character) = self.selected.clone() else {
            return;
        };

        self.ai_loading = true;
        self.ai_result = None;
        self.narrator.stop();

        let backend = self.backend.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = backend.generate_dialogue(&character).await;
            let _ = events.send(AppEvent::DialogueReady {
                character_id: character.id,
                result,
            });
        });
    }

    fn on_dialogue_ready(&mut self, character_id: &str, result: DialogueResult) {
        let current = self.selected.as_ref().map(|c| c.id.as_str());
        if !self.ai_loading || current != Some(character_id) {
            debug!("Dropping dialogue for character {character_id}");
            return;
        }
        self.ai_loading = false;

        if result.success && !result.dialogue.is_empty() && !self.narrator.is_muted() {
            self.narrator.speak(&result.dialogue);
        }
        self.ai_result = Some(result);
    }

    /// Flip the global mute; returns the new state.
    pub fn toggle_mute(&mut self) -> bool {
        let dialogue = self
            .ai_result
            .as_ref()
            .map(|r| r.dialogue.as_str())
            .filter(|d| !d.is_empty());
        self.narrator.toggle_mute(dialogue)
    }

    /// Apply narration progress. Returns true when a new line became active
    /// in a script that is on screen, so the caller should redraw.
    pub fn handle_speech_event(&mut self, event: SpeechEvent) -> bool {
        let started = self.narrator.handle_event(event);
        started && self.is_script_visible()
    }

    /// Whether the generated script is shown in the open detail view.
    pub fn is_script_visible(&self) -> bool {
        self.selected.is_some() && self.ai_result.is_some() && !self.script_collapsed
    }

    // --- Notes ---

    pub fn set_note_input(&mut self, text: &str) {
        self.note_input = text.to_string();
    }

    /// Save the note input, then reload the character's notes from the backend.
    pub fn save_note(&mut self) {
        if self.note_input.trim().is_empty() {
            return;
        }
        let Some(character) = self.selected.as_ref() else {
            return;
        };

        let character_id = character.id.clone();
        let note = self.note_input.clone();
        let backend = self.backend.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = match backend.save_note(&character_id, &note).await {
                Ok(_) => backend.get_notes(&character_id).await,
                Err(e) => Err(e),
            };
            let _ = events.send(AppEvent::NoteSaved {
                character_id,
                result,
            });
        });
    }

    /// Delete a note of the open character. Notes without a backend id
    /// cannot be deleted.
    pub fn delete_note(&mut self, note_id: Option<&NoteId>) {
        let (Some(character), Some(note_id)) = (self.selected.as_ref(), note_id) else {
            return;
        };

        let character_id = character.id.clone();
        let note_id = note_id.clone();
        let backend = self.backend.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = backend.delete_note(&note_id).await.map(|_| ());
            let _ = events.send(AppEvent::NoteDeleted {
                character_id,
                note_id,
                result,
            });
        });
    }

    /// Delete the open character's note whose id prints as `id`.
    pub fn delete_note_by_label(&mut self, id: &str) -> bool {
        let note_id = self
            .selected_notes()
            .iter()
            .filter_map(|n| n.id.as_ref())
            .find(|nid| nid.to_string() == id)
            .cloned();

        match note_id {
            Some(note_id) => {
                self.delete_note(Some(&note_id));
                true
            }
            None => false,
        }
    }

    // --- Search ---

    pub fn set_search_query(&mut self, query: &str) {
        self.search_query = query.to_string();
    }

    /// Run a search for `query` typed at the prompt. Returns false, leaving
    /// the current query untouched, while another search or a catalog page
    /// is still loading.
    pub fn submit_search(&mut self, query: &str) -> bool {
        if !query.trim().is_empty() && (self.searching || self.loading) {
            return false;
        }
        self.set_search_query(query);
        self.search();
        true
    }

    pub fn search(&mut self) {
        if self.search_query.trim().is_empty() {
            self.search_result = None;
            return;
        }
        if self.searching || self.loading {
            return;
        }

        self.searching = true;
        let query = self.search_query.clone();
        let backend = self.backend.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let response = backend.semantic_search(&query).await;
            let _ = events.send(AppEvent::SearchFinished { query, response });
        });
    }

    pub fn clear_search(&mut self) {
        self.search_query.clear();
        self.search_result = None;
    }

    fn on_search_finished(&mut self, query: &str, response: SearchResponse) {
        self.searching = false;
        if query != self.search_query {
            debug!("Dropping results for stale query {query:?}");
            return;
        }

        self.search_result = match response {
            SearchResponse::Structured(result) => {
                info!("Search {query:?} matched {} characters", result.count);
                Some(result)
            }
            SearchResponse::Unstructured => None,
        };
    }

    // --- Events ---

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::CatalogLoaded { page, result } => self.on_catalog_loaded(page, result),
            AppEvent::NotesLoaded {
                character_id,
                result,
            } => match result {
                Ok(notes) => self.notes.replace(&character_id, notes),
                Err(e) => warn!("Failed to load notes for {character_id}: {e}"),
            },
            AppEvent::NoteSaved {
                character_id,
                result,
            } => match result {
                Ok(notes) => {
                    self.notes.replace(&character_id, notes);
                    if self.selected.as_ref().map(|c| c.id.as_str()) == Some(character_id.as_str()) {
                        self.note_input.clear();
                    }
                }
                Err(e) => warn!("Failed to save note for {character_id}: {e}"),
            },
            AppEvent::NoteDeleted {
                character_id,
                note_id,
                result,
            } => match result {
                Ok(()) => {
                    self.notes.remove(&character_id, &note_id);
                }
                Err(e) => warn!("Failed to delete note {note_id}: {e}"),
            },
            AppEvent::DialogueReady {
                character_id,
                result,
            } => self.on_dialogue_ready(&character_id, result),
            AppEvent::SearchFinished { query, response } => self.on_search_finished(&query, response),
        }
    }

    // --- Accessors ---

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    pub fn has_next(&self) -> bool {
        self.has_next
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn selected(&self) -> Option<&Character> {
        self.selected.as_ref()
    }

    pub fn ai_result(&self) -> Option<&DialogueResult> {
        self.ai_result.as_ref()
    }

    pub fn is_ai_loading(&self) -> bool {
        self.ai_loading
    }

    pub fn is_script_collapsed(&self) -> bool {
        self.script_collapsed
    }

    pub fn note_input(&self) -> &str {
        &self.note_input
    }

    pub fn selected_notes(&self) -> &[Note] {
        match &self.selected {
            Some(c) => self.notes.get(&c.id),
            None => &[],
        }
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    pub fn is_searching(&self) -> bool {
        self.searching
    }

    pub fn search_result(&self) -> Option<&SearchResult> {
        self.search_result.as_ref()
    }

    pub fn narrator(&self) -> &Narrator {
        &self.narrator
    }
}
