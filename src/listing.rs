#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! The code listing: annotation index, the rendered table it drives, and the
//! toggles and badge derived from it.

use std::collections::HashSet;

use itertools::Itertools;
use typed_builder::TypedBuilder;

use crate::{
    annotation::{Annotation, AnnotationId, SharedIds},
    client::{AnnotationClient, TransitionOutcome},
    error::{AnnotationError, Result},
    form::default_title,
    i18n::Locale,
    index::{AnnotationIndex, IndexEvent},
    notice::Notifier,
    payload::{MachineAnnotationData, UserAnnotationData},
    render::{AnnotationRenderer, Element, HIDE_CLASS, HeaderAction, ViewCache},
    transport::Transport,
    types::{AnnotationType, Group, LineKey, QuestionState},
};

/// Class marking highlighted code rows.
const MARKING_CLASS: &str = "marked";

/// Construction options of a listing.
#[derive(Clone, Debug, Default, TypedBuilder)]
pub struct ListingOptions {
    /// Language of generated strings.
    #[builder(default)]
    pub locale:        Locale,
    /// Whether the course runs beta features.
    #[builder(default)]
    pub beta:          bool,
    /// Evaluation new annotations are attached to.
    #[builder(default)]
    pub evaluation_id: Option<u64>,
}

/// Which annotations are currently collapsed.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Visibility {
    /// Everything shown.
    #[default]
    All,
    /// Only important and global annotations shown.
    Important,
    /// Only global annotations shown.
    Collapsed,
}

impl Visibility {
    /// Whether `annotation` is collapsed under this mode.
    fn hides(self, annotation: &Annotation) -> bool {
        if annotation.global() {
            return false;
        }
        match self {
            Visibility::All => false,
            Visibility::Important => !annotation.important(),
            Visibility::Collapsed => true,
        }
    }
}

/// Container of one annotation group inside a cell or the global panel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupSlot {
    /// Group rendered here.
    group:   Group,
    /// Mounted annotations, in mount order.
    members: Vec<AnnotationId>,
}

impl GroupSlot {
    /// Creates an empty container.
    fn new(group: Group) -> Self {
        Self {
            group,
            members: Vec::new(),
        }
    }

    /// Group rendered here.
    pub fn group(&self) -> Group {
        self.group
    }

    /// Mounted annotations.
    pub fn members(&self) -> &[AnnotationId] {
        &self.members
    }
}

/// Finds the container of `group`.
fn slot_mut(slots: &mut [GroupSlot], group: Group) -> Option<&mut GroupSlot> {
    slots.iter_mut().find(|slot| slot.group == group)
}

/// Gutter indicator summarizing collapsed annotations of a row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dot {
    /// Whether the dot is hidden.
    hidden:  bool,
    /// Distinct types of the collapsed annotations.
    colours: Vec<AnnotationType>,
    /// Tooltip.
    title:   Option<String>,
}

impl Dot {
    /// Whether the dot is hidden.
    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// Distinct types of the collapsed annotations.
    pub fn colours(&self) -> &[AnnotationType] {
        &self.colours
    }

    /// Tooltip.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Css classes of the dot.
    pub fn classes(&self) -> Vec<String> {
        let mut classes = vec!["dot".to_string()];
        if self.hidden {
            classes.push(HIDE_CLASS.to_string());
        }
        classes.extend(self.colours.iter().map(|kind| kind.dot_class()));
        classes
    }
}

/// One row of the code table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodeRow {
    /// 1-based line number.
    line:   usize,
    /// Source code of the line.
    code:   String,
    /// Highlighted.
    marked: bool,
    /// Gutter dot, created with the first annotation on the row.
    dot:    Option<Dot>,
    /// Group containers, created with the first annotation on the row.
    groups: Vec<GroupSlot>,
}

impl CodeRow {
    /// 1-based line number.
    pub fn line(&self) -> usize {
        self.line
    }

    /// Source code of the line.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Highlighted.
    pub fn is_marked(&self) -> bool {
        self.marked
    }

    /// Gutter dot.
    pub fn dot(&self) -> Option<&Dot> {
        self.dot.as_ref()
    }

    /// Group containers in rendering order.
    pub fn groups(&self) -> &[GroupSlot] {
        &self.groups
    }

    /// Creates the dot and group containers unless they exist already.
    fn ensure_cell(&mut self) {
        if self.dot.is_none() {
            self.dot = Some(Dot {
                hidden:  true,
                colours: Vec::new(),
                title:   None,
            });
        }
        if self.groups.is_empty() {
            self.groups = Group::ordered().iter().copied().map(GroupSlot::new).collect();
        }
    }
}

/// Panel holding global annotations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlobalPanel {
    /// Padding class toggled while the panel is non-empty.
    has_annotations: bool,
    /// Group containers, created up front.
    groups:          Vec<GroupSlot>,
}

impl GlobalPanel {
    /// Whether the panel carries the `has-annotations` class.
    pub fn has_annotations(&self) -> bool {
        self.has_annotations
    }

    /// Group containers in rendering order.
    pub fn groups(&self) -> &[GroupSlot] {
        &self.groups
    }
}

/// Badge and toggle buttons.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Toolbar {
    /// Badge text.
    badge:              String,
    /// Whether the toggle row is hidden.
    toggles_hidden:     bool,
    /// Whether the "show errors only" toggle is hidden.
    show_errors_hidden: bool,
}

impl Toolbar {
    /// Badge text.
    pub fn badge(&self) -> &str {
        &self.badge
    }

    /// Whether the toggle row is hidden.
    pub fn toggles_hidden(&self) -> bool {
        self.toggles_hidden
    }

    /// Whether the "show errors only" toggle is hidden.
    pub fn show_errors_hidden(&self) -> bool {
        self.show_errors_hidden
    }
}

/// Where an annotation view is mounted.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Mount {
    /// In the global panel.
    Global,
    /// In the cell of a code row.
    Row(usize),
}

/// Aggregate owning the annotations of one submission and everything
/// rendered from them.
pub struct CodeListing {
    /// Submission shown.
    submission_id: u64,
    /// Source code shown.
    code:          String,
    /// Evaluation new annotations are attached to.
    evaluation_id: Option<u64>,
    /// Identity source for annotations built here.
    ids:           SharedIds,
    /// Source of truth for what is rendered.
    index:         AnnotationIndex,
    /// Memoized annotation views.
    views:         ViewCache,
    /// Code rows, at least one.
    rows:          Vec<CodeRow>,
    /// Global annotation panel.
    global:        GlobalPanel,
    /// Badge and toggles.
    toolbar:       Toolbar,
    /// Current collapse mode.
    visibility:    Visibility,
    /// Annotations with an open edit form.
    editing:       HashSet<AnnotationId>,
}

impl CodeListing {
    /// Binds a listing to the code of a submission.
    pub fn new(
        submission_id: u64,
        code: impl Into<String>,
        options: ListingOptions,
        ids: SharedIds,
    ) -> Self {
        let code = code.into();
        let mut rows: Vec<CodeRow> = code
            .lines()
            .enumerate()
            .map(|(i, line)| CodeRow {
                line:   i + 1,
                code:   line.to_string(),
                marked: false,
                dot:    None,
                groups: Vec::new(),
            })
            .collect();
        if rows.is_empty() {
            rows.push(CodeRow {
                line:   1,
                code:   String::new(),
                marked: false,
                dot:    None,
                groups: Vec::new(),
            });
        }

        let mut listing = Self {
            submission_id,
            code,
            evaluation_id: options.evaluation_id,
            ids,
            index: AnnotationIndex::new(),
            views: ViewCache::new(AnnotationRenderer::new(options.locale, options.beta)),
            rows,
            global: GlobalPanel {
                has_annotations: false,
                groups:          Group::ordered().iter().copied().map(GroupSlot::new).collect(),
            },
            toolbar: Toolbar::default(),
            visibility: Visibility::All,
            editing: HashSet::new(),
        };
        listing.update_view_state();
        listing
    }

    /// Submission shown.
    pub fn submission_id(&self) -> u64 {
        self.submission_id
    }

    /// Source code, as copied to the clipboard.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Number of code rows.
    pub fn code_lines(&self) -> usize {
        self.rows.len()
    }

    /// Evaluation new annotations are attached to.
    pub fn evaluation_id(&self) -> Option<u64> {
        self.evaluation_id
    }

    /// Sets the evaluation new annotations are attached to.
    pub fn set_evaluation(&mut self, evaluation_id: Option<u64>) {
        self.evaluation_id = evaluation_id;
    }

    /// Identity source shared with clients.
    pub fn ids(&self) -> SharedIds {
        self.ids.clone()
    }

    /// Annotation index.
    pub fn index(&self) -> &AnnotationIndex {
        &self.index
    }

    /// Memoized views.
    pub fn views(&self) -> &ViewCache {
        &self.views
    }

    /// Looks an annotation up.
    pub fn annotation(&self, id: AnnotationId) -> Option<&Annotation> {
        self.index.get(id)
    }

    /// Annotations of one line, in insertion order.
    pub fn annotations_for_line(&self, line: Option<usize>) -> &[Annotation] {
        self.index.line(LineKey::of(line))
    }

    /// Total number of annotations.
    pub fn count(&self) -> usize {
        self.index.count()
    }

    /// Number of important annotations.
    pub fn important_count(&self) -> usize {
        self.index.important_count()
    }

    /// Code row by 1-based line.
    pub fn row(&self, line: usize) -> Option<&CodeRow> {
        line.checked_sub(1).and_then(|i| self.rows.get(i))
    }

    /// Global panel.
    pub fn global_panel(&self) -> &GlobalPanel {
        &self.global
    }

    /// Badge and toggles.
    pub fn toolbar(&self) -> &Toolbar {
        &self.toolbar
    }

    /// Current collapse mode.
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Whether the view of an annotation is mounted and not collapsed.
    pub fn is_shown(&self, id: AnnotationId) -> bool {
        self.mount_of(id).is_some() && !self.views.is_hidden(id)
    }

    /// Row an annotation on `line` is rendered in: lines past the end land on
    /// the last row.
    pub fn row_for(&self, line: usize) -> usize {
        line.clamp(1, self.rows.len())
    }

    /// Every mounted view and where it is mounted.
    pub fn mounts(&self) -> Vec<(AnnotationId, Mount)> {
        let global = self
            .global
            .groups
            .iter()
            .flat_map(|slot| slot.members.iter().map(|id| (*id, Mount::Global)));
        let rows = self.rows.iter().flat_map(|row| {
            row.groups.iter().flat_map(move |slot| {
                slot.members
                    .iter()
                    .map(move |id| (*id, Mount::Row(row.line)))
            })
        });
        global.chain(rows).collect()
    }

    /// Where the view of an annotation is mounted.
    pub fn mount_of(&self, id: AnnotationId) -> Option<Mount> {
        self.mounts()
            .into_iter()
            .find(|(mounted, _)| *mounted == id)
            .map(|(_, mount)| mount)
    }

    // ------------------------------------------------------------------
    // Annotation management
    // ------------------------------------------------------------------

    /// Indexes an annotation and mounts its view.
    pub fn add_annotation(&mut self, annotation: Annotation) -> AnnotationId {
        let id = annotation.id();
        self.views.html(&annotation);
        let event = self.index.add(annotation);
        tracing::debug!("annotation {id} added: {event:?}");
        self.apply(&event);
        self.update_view_state();
        id
    }

    /// Adds linter findings.
    pub fn add_machine_annotations(&mut self, data: &[MachineAnnotationData]) -> Vec<AnnotationId> {
        data.iter()
            .map(|item| {
                let annotation = Annotation::machine(item, self.ids.as_ref());
                self.add_annotation(annotation)
            })
            .collect()
    }

    /// Adds user annotations and questions from server payloads.
    pub fn add_user_annotations(&mut self, data: &[UserAnnotationData]) -> Vec<AnnotationId> {
        data.iter()
            .map(|item| {
                let annotation = Annotation::from_user_data(item, self.ids.as_ref());
                self.add_annotation(annotation)
            })
            .collect()
    }

    /// Fetches every user annotation of the submission and adds them in
    /// server order.
    pub async fn load_user_annotations<T: Transport>(
        &mut self,
        client: &AnnotationClient<T>,
    ) -> Result<usize> {
        let annotations = client
            .get_all_user_annotations(self.submission_id)
            .await?;
        let count = annotations.len();
        for annotation in annotations {
            self.add_annotation(annotation);
        }
        Ok(count)
    }

    /// Drops an annotation, matched by identity, and detaches its view.
    pub fn remove_annotation(&mut self, annotation: &Annotation) {
        match self.index.remove(annotation) {
            Some(event) => {
                tracing::debug!("annotation {} removed: {event:?}", annotation.id());
                self.apply(&event);
            }
            None => {
                // already gone; still make sure nothing stays mounted
                self.unmount(annotation.id());
                self.views.remove(annotation.id());
            }
        }
        self.update_view_state();
    }

    /// Replaces `original` by `updated`. On the same line the view is swapped
    /// in place and siblings keep their position; across lines this is a
    /// remove followed by an add.
    pub fn update_annotation(&mut self, original: &Annotation, updated: Annotation) {
        self.editing.remove(&original.id());
        if original.id() == updated.id() {
            self.views.invalidate(updated.id());
        }
        self.views.html(&updated);
        let new_id = updated.id();
        let events = self.index.update(original, updated);
        if events.is_empty() {
            tracing::debug!("annotation {} is no longer indexed, update dropped", original.id());
            self.views.remove(new_id);
            return;
        }
        for event in &events {
            self.apply(event);
        }
        self.update_view_state();
    }

    /// Links an annotation to a saved annotation and refreshes its indicator.
    pub fn link_saved_annotation(&mut self, id: AnnotationId, saved: Option<u64>) {
        if let Some(annotation) = self.index.get_mut(id) {
            annotation.set_saved_annotation_id(saved);
            self.views.set_saved(id, saved);
        }
    }

    /// Stores the text of a listed annotation as a reusable saved annotation
    /// and links the annotation to it. `title` defaults to the leading words
    /// of the text. A rejected save raises an alert with the validation
    /// messages and leaves the annotation unlinked.
    pub async fn save_annotation<T: Transport>(
        &mut self,
        client: &AnnotationClient<T>,
        id: AnnotationId,
        title: Option<&str>,
        notifier: &dyn Notifier,
    ) -> Result<u64> {
        let (from, text) = self
            .index
            .get(id)
            .filter(|annotation| annotation.savable())
            .and_then(|annotation| {
                let from = annotation.server_id()?;
                Some((from, annotation.raw_text().to_string()))
            })
            .ok_or_else(|| AnnotationError::Contract(format!("annotation {id} cannot be saved")))?;
        let title = match title.map(str::trim) {
            Some(title) if !title.is_empty() => title.to_string(),
            _ => default_title(&text),
        };

        match client.create_saved_annotation(from, &title, &text).await {
            Ok(saved) => {
                self.link_saved_annotation(id, Some(saved.id));
                Ok(saved.id)
            }
            Err(e) => {
                let locale = self.views.locale();
                notifier.alert(&locale.save_failed(e.validation_messages()));
                Err(e)
            }
        }
    }

    /// Applies an index event to the rendered table.
    fn apply(&mut self, event: &IndexEvent) {
        match *event {
            IndexEvent::Added { id, key, .. } => {
                self.mount(id, key);
                self.settle(id);
            }
            IndexEvent::Removed { id, key, emptied } => {
                let mount = self.unmount(id);
                self.views.remove(id);
                self.editing.remove(&id);
                if emptied && key == LineKey::Global {
                    self.global.has_annotations = false;
                }
                if let Some(Mount::Row(row)) = mount {
                    self.refresh_dot(row);
                }
            }
            IndexEvent::Replaced { old, new, key, .. } => {
                if !self.replace_mount(old, new) {
                    self.unmount(old);
                    self.mount(new, key);
                }
                if old != new {
                    self.views.remove(old);
                    self.editing.remove(&old);
                }
                self.settle(new);
            }
        }
    }

    /// Applies the current collapse mode to a freshly mounted view and
    /// re-derives the dot of its row.
    fn settle(&mut self, id: AnnotationId) {
        let hidden = self
            .index
            .get(id)
            .is_some_and(|annotation| self.visibility.hides(annotation));
        if hidden {
            self.views.hide(id);
        } else {
            self.views.show(id);
        }
        if let Some(Mount::Row(row)) = self.mount_of(id) {
            self.refresh_dot(row);
        }
    }

    /// Mounts the view of an indexed annotation.
    fn mount(&mut self, id: AnnotationId, key: LineKey) {
        let Some(group) = self
            .index
            .get(id)
            .map(|annotation| annotation.annotation_type().group())
        else {
            return;
        };

        match key {
            LineKey::Global => {
                if let Some(slot) = slot_mut(&mut self.global.groups, group) {
                    slot.members.push(id);
                }
                self.global.has_annotations = true;
            }
            LineKey::Line(line) => {
                let row = self.row_for(line);
                let row = &mut self.rows[row - 1];
                row.ensure_cell();
                if let Some(slot) = slot_mut(&mut row.groups, group) {
                    slot.members.push(id);
                }
            }
        }
    }

    /// Detaches a view from wherever it is mounted.
    fn unmount(&mut self, id: AnnotationId) -> Option<Mount> {
        let mount = self.mount_of(id)?;
        let slots = match mount {
            Mount::Global => &mut self.global.groups,
            Mount::Row(row) => &mut self.rows[row - 1].groups,
        };
        for slot in slots.iter_mut() {
            slot.members.retain(|member| *member != id);
        }
        Some(mount)
    }

    /// Swaps a mounted view for another in the same container. Returns
    /// `false` when that is not possible.
    fn replace_mount(&mut self, old: AnnotationId, new: AnnotationId) -> bool {
        let Some(group) = self.index.get(new).map(|a| a.annotation_type().group()) else {
            return false;
        };
        let Some(mount) = self.mount_of(old) else {
            return false;
        };
        let slots = match mount {
            Mount::Global => &mut self.global.groups,
            Mount::Row(row) => &mut self.rows[row - 1].groups,
        };
        let Some(slot) = slot_mut(slots, group) else {
            return false;
        };
        match slot.members.iter().position(|member| *member == old) {
            Some(position) => {
                slot.members[position] = new;
                true
            }
            None => false,
        }
    }

    /// Annotations rendered in a row, across all line keys clamped onto it.
    fn row_annotations(&self, row: usize) -> Vec<&Annotation> {
        self.index
            .lines()
            .filter_map(|(key, annotations)| match key {
                LineKey::Line(line) if self.row_for(line) == row => Some(annotations),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// Re-derives the dot of a row from the current collapse mode.
    fn refresh_dot(&mut self, row: usize) {
        let locale = self.views.locale();
        let collapsed: Vec<AnnotationType> = self
            .row_annotations(row)
            .into_iter()
            .filter(|annotation| self.visibility.hides(annotation))
            .map(Annotation::annotation_type)
            .collect();

        let Some(dot) = self.rows.get_mut(row - 1).and_then(|r| r.dot.as_mut()) else {
            return;
        };
        if collapsed.is_empty() {
            dot.hidden = true;
            dot.colours.clear();
            dot.title = None;
        } else {
            dot.hidden = false;
            dot.title = Some(locale.hidden(collapsed.len()));
            dot.colours = collapsed.into_iter().unique().collect();
        }
    }

    // ------------------------------------------------------------------
    // Show and hide
    // ------------------------------------------------------------------

    /// Collapses line annotations, keeping important ones when asked. Global
    /// annotations always stay visible.
    pub fn hide_annotations(&mut self, keep_important: bool) {
        self.visibility = if keep_important {
            Visibility::Important
        } else {
            Visibility::Collapsed
        };
        self.apply_visibility();
    }

    /// Shows every annotation and hides every dot.
    pub fn show_annotations(&mut self) {
        self.visibility = Visibility::All;
        self.apply_visibility();
    }

    /// Applies the collapse mode to every view and dot.
    fn apply_visibility(&mut self) {
        let rows: Vec<usize> = self
            .rows
            .iter()
            .filter(|row| row.dot.is_some())
            .map(|row| row.line)
            .collect();
        for row in rows {
            self.refresh_dot(row);
        }

        let decisions: Vec<(AnnotationId, bool)> = self
            .index
            .iter()
            .map(|annotation| (annotation.id(), self.visibility.hides(annotation)))
            .collect();
        for (id, hidden) in decisions {
            if hidden {
                self.views.hide(id);
            } else {
                self.views.show(id);
            }
        }
    }

    // ------------------------------------------------------------------
    // Highlighting
    // ------------------------------------------------------------------

    /// Marks a code row.
    pub fn highlight_line(&mut self, line: usize) {
        let row = self.row_for(line);
        self.rows[row - 1].marked = true;
    }

    /// Unmarks every code row.
    pub fn clear_highlights(&mut self) {
        for row in &mut self.rows {
            row.marked = false;
        }
    }

    // ------------------------------------------------------------------
    // View state
    // ------------------------------------------------------------------

    /// Re-derives the badge and toggle visibility from the index.
    pub fn update_view_state(&mut self) {
        let amount = self.index.count();
        if amount > 0 {
            let important = self.index.important_count();
            self.toolbar.badge = amount.to_string();
            self.toolbar.show_errors_hidden = important == 0 || important == amount;
            self.toolbar.toggles_hidden = false;
        } else {
            self.toolbar.badge = String::new();
            self.toolbar.toggles_hidden = true;
        }
    }

    // ------------------------------------------------------------------
    // Questions and editing
    // ------------------------------------------------------------------

    /// Moves a question to another state and converges the listing with the
    /// server's answer.
    pub async fn transition_question<T: Transport>(
        &mut self,
        client: &AnnotationClient<T>,
        id: AnnotationId,
        to: QuestionState,
        notifier: &dyn Notifier,
    ) -> Result<TransitionOutcome> {
        let original = self
            .index
            .get(id)
            .cloned()
            .ok_or_else(|| AnnotationError::Contract(format!("annotation {id} is not listed")))?;
        let outcome = client.transition(&original, to).await?;
        self.apply_transition(&original, &outcome, notifier);
        Ok(outcome)
    }

    /// Converges the listing after a transition attempt on `original`.
    pub fn apply_transition(
        &mut self,
        original: &Annotation,
        outcome: &TransitionOutcome,
        notifier: &dyn Notifier,
    ) {
        let locale = self.views.locale();
        match outcome {
            TransitionOutcome::Transitioned(updated) => {
                self.update_annotation(original, updated.clone());
            }
            TransitionOutcome::Gone => {
                notifier.toast(locale.question_deleted());
                self.remove_annotation(original);
            }
            TransitionOutcome::Refreshed(updated) => {
                notifier.toast(locale.question_conflict());
                self.update_annotation(original, updated.clone());
            }
        }
    }

    /// Header controls of a mounted annotation.
    pub fn actions(&self, id: AnnotationId) -> Vec<HeaderAction> {
        self.views.actions(id)
    }

    /// Opens editing of a modifiable annotation: hides its edit button and
    /// returns the text to prefill. `None` when editing is not allowed.
    pub fn begin_edit(&mut self, id: AnnotationId) -> Option<String> {
        let annotation = self.index.get(id).filter(|a| a.modifiable())?;
        let text = annotation.raw_text().to_string();
        self.set_edit_button_hidden(id, true);
        self.editing.insert(id);
        Some(text)
    }

    /// Closes editing without changes and restores the edit button.
    pub fn end_edit(&mut self, id: AnnotationId) {
        if self.editing.remove(&id) {
            self.set_edit_button_hidden(id, false);
        }
    }

    /// Whether an edit form is open for an annotation.
    pub fn is_editing(&self, id: AnnotationId) -> bool {
        self.editing.contains(&id)
    }

    /// Toggles the edit button of a view.
    fn set_edit_button_hidden(&mut self, id: AnnotationId, hidden: bool) {
        let Some(button) = self
            .views
            .get_mut(id)
            .and_then(|view| view.find_by_class_mut("annotation-edit"))
        else {
            return;
        };
        if hidden {
            button.add_class(HIDE_CLASS);
        } else {
            button.remove_class(HIDE_CLASS);
        }
    }

    // ------------------------------------------------------------------
    // Html
    // ------------------------------------------------------------------

    /// Container element of a group with its mounted views.
    fn group_element(&self, slot: &GroupSlot) -> Element {
        slot.members
            .iter()
            .filter_map(|id| self.views.get(*id))
            .fold(Element::new("div").with_classes([slot.group.class()]), |el, view| {
                el.with_child(view.clone())
            })
    }

    /// Badge and toggle buttons.
    fn toolbar_element(&self) -> Element {
        let mut toggles = Element::new("div")
            .with_id("annotations_toggles")
            .with_child(Element::new("button").with_id("show_all_annotations"))
            .with_child(Element::new("button").with_id("hide_all_annotations"));
        let mut show_errors = Element::new("button").with_id("show_only_errors");
        if self.toolbar.show_errors_hidden {
            show_errors.add_class(HIDE_CLASS);
        }
        toggles.push(show_errors);
        if self.toolbar.toggles_hidden {
            toggles.add_class(HIDE_CLASS);
        }

        Element::new("div")
            .with_classes(["code-listing-toolbar"])
            .with_child(
                Element::new("span")
                    .with_id("badge_code")
                    .with_text(self.toolbar.badge.clone()),
            )
            .with_child(toggles)
    }

    /// Global annotation panel.
    fn global_element(&self) -> Element {
        let list = self.global.groups.iter().fold(
            Element::new("div").with_id("feedback-table-global-annotations-list"),
            |el, slot| el.with_child(self.group_element(slot)),
        );
        let mut panel = Element::new("div")
            .with_id("feedback-table-global-annotations")
            .with_child(list);
        if self.global.has_annotations {
            panel.add_class("has-annotations");
        }
        panel
    }

    /// One code row.
    fn row_element(&self, row: &CodeRow) -> Element {
        let mut gutter = Element::new("td").with_classes(["rouge-gutter", "gl"]);
        if let Some(dot) = &row.dot {
            let mut span = Element::new("span")
                .with_id(format!("dot-{}", row.line))
                .with_classes(dot.classes());
            if let Some(title) = &dot.title {
                span.set_attr("title", title.clone());
            }
            gutter.push(span);
        }
        gutter.push(Element::new("pre").with_text(row.line.to_string()));

        let cell = row.groups.iter().fold(
            Element::new("div")
                .with_id(format!("annotation-cell-{}", row.line))
                .with_classes(["annotation-cell"]),
            |el, slot| el.with_child(self.group_element(slot)),
        );
        let code = Element::new("td")
            .with_classes(["rouge-code"])
            .with_child(Element::new("pre").with_text(row.code.clone()))
            .with_child(cell);

        let mut tr = Element::new("tr")
            .with_id(format!("line-{}", row.line))
            .with_classes(["lineno"])
            .with_attr("data-line", row.line.to_string())
            .with_child(gutter)
            .with_child(code);
        if row.marked {
            tr.add_class(MARKING_CLASS);
        }
        tr
    }

    /// Renders toolbar, global panel and code table.
    pub fn to_html(&self) -> String {
        let table = self.rows.iter().fold(Element::new("tbody"), |el, row| {
            el.with_child(self.row_element(row))
        });
        let table = Element::new("table")
            .with_classes(["code-listing"])
            .with_child(table);

        let mut out = String::new();
        self.toolbar_element().write_html(&mut out);
        self.global_element().write_html(&mut out);
        table.write_html(&mut out);
        out
    }
}
