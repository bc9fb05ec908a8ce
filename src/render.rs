#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Html model of annotations and the memoized per-annotation views.

use std::collections::HashMap;

use crate::{
    annotation::{Annotation, AnnotationId, NoticeStyle},
    i18n::Locale,
    types::QuestionState,
};

/// Css class toggled by show/hide.
pub const HIDE_CLASS: &str = "hide";

/// Escapes text for inclusion in html content or attribute values.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Minimal owned html element.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Element {
    /// Tag name.
    tag:      String,
    /// Element id.
    id:       Option<String>,
    /// Css classes, in insertion order and without duplicates.
    classes:  Vec<String>,
    /// Other attributes.
    attrs:    Vec<(String, String)>,
    /// Text content, escaped when serialized.
    text:     Option<String>,
    /// Trusted html content, emitted verbatim.
    html:     Option<String>,
    /// Child elements, emitted after text and html.
    children: Vec<Element>,
}

impl Element {
    /// Creates an empty element.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    /// Sets the id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Adds css classes.
    pub fn with_classes<I, S>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for class in classes {
            self.add_class(class);
        }
        self
    }

    /// Sets an attribute.
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Sets the text content.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Sets trusted html content.
    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    /// Appends a child.
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Tag name.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Element id.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Text content.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Replaces the text content.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = Some(text.into());
    }

    /// Css classes.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Whether the class is present.
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// Adds a class unless already present.
    pub fn add_class(&mut self, class: impl Into<String>) {
        let class = class.into();
        if !self.has_class(&class) {
            self.classes.push(class);
        }
    }

    /// Removes a class if present.
    pub fn remove_class(&mut self, class: &str) {
        self.classes.retain(|c| c != class);
    }

    /// Reads an attribute.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Sets or replaces an attribute.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attrs.iter_mut().find(|(key, _)| *key == name) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name, value)),
        }
    }

    /// Child elements.
    pub fn children(&self) -> &[Element] {
        &self.children
    }

    /// Appends a child.
    pub fn push(&mut self, child: Element) {
        self.children.push(child);
    }

    /// Depth-first search for the first descendant (or self) with a class.
    pub fn find_by_class(&self, class: &str) -> Option<&Element> {
        if self.has_class(class) {
            return Some(self);
        }
        self.children
            .iter()
            .find_map(|child| child.find_by_class(class))
    }

    /// Mutable variant of [`Element::find_by_class`].
    pub fn find_by_class_mut(&mut self, class: &str) -> Option<&mut Element> {
        if self.has_class(class) {
            return Some(self);
        }
        self.children
            .iter_mut()
            .find_map(|child| child.find_by_class_mut(class))
    }

    /// Number of descendants (and self) carrying a class.
    pub fn count_by_class(&self, class: &str) -> usize {
        usize::from(self.has_class(class))
            + self
                .children
                .iter()
                .map(|child| child.count_by_class(class))
                .sum::<usize>()
    }

    /// Serializes the element to html.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    /// Appends the serialized element to `out`.
    pub fn write_html(&self, out: &mut String) {
        self.open_tag(out);
        self.write_contents(out);
        self.close_tag(out);
    }

    /// Writes `<tag ...>`.
    pub(crate) fn open_tag(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.tag);
        if let Some(id) = &self.id {
            out.push_str(&format!(" id=\"{}\"", escape_html(id)));
        }
        if !self.classes.is_empty() {
            out.push_str(&format!(" class=\"{}\"", escape_html(&self.classes.join(" "))));
        }
        for (name, value) in &self.attrs {
            out.push_str(&format!(" {name}=\"{}\"", escape_html(value)));
        }
        out.push('>');
    }

    /// Writes text, trusted html and children.
    pub(crate) fn write_contents(&self, out: &mut String) {
        if let Some(text) = &self.text {
            out.push_str(&escape_html(text));
        }
        if let Some(html) = &self.html {
            out.push_str(html);
        }
        for child in &self.children {
            child.write_html(out);
        }
    }

    /// Writes `</tag>`.
    pub(crate) fn close_tag(&self, out: &mut String) {
        out.push_str("</");
        out.push_str(&self.tag);
        out.push('>');
    }
}

/// Control rendered in an annotation header, identified by its `data-action`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HeaderAction {
    /// Follow the notice link.
    Notice(String),
    /// Open the inline edit form.
    Edit,
    /// Save the annotation as a reusable annotation.
    Save,
    /// Move a question to another state.
    Transition(QuestionState),
}

impl HeaderAction {
    /// Reads the action wired to a control element.
    fn from_element(element: &Element) -> Option<Self> {
        match element.attr("data-action")? {
            "notice" => element
                .attr("href")
                .map(|url| HeaderAction::Notice(url.to_string())),
            "edit" => Some(HeaderAction::Edit),
            "save" => Some(HeaderAction::Save),
            "transition" => element
                .attr("data-target")
                .and_then(|target| target.parse().ok())
                .map(HeaderAction::Transition),
            _ => None,
        }
    }
}

/// Builds annotation views.
#[derive(Debug, Default)]
pub struct AnnotationRenderer {
    /// Language of generated strings.
    locale:    Locale,
    /// Whether the course runs beta features.
    beta:      bool,
    /// Number of times math typesetting was requested.
    typesets:  usize,
}

impl AnnotationRenderer {
    /// Creates a renderer.
    pub fn new(locale: Locale, beta: bool) -> Self {
        Self {
            locale,
            beta,
            typesets: 0,
        }
    }

    /// Language of generated strings.
    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Number of math rescans requested so far, one per built view.
    pub fn typesets(&self) -> usize {
        self.typesets
    }

    /// Builds the complete view of an annotation.
    pub fn build(&mut self, annotation: &Annotation) -> Element {
        let mut root = Element::new("div")
            .with_classes(["annotation", annotation.annotation_type().as_str()])
            .with_id(view_id(annotation.id()))
            .with_attr("title", annotation.title(self.locale));
        if let Some(class) = annotation.extra_class() {
            root.add_class(class);
        }

        root.push(self.header(annotation));
        root.push(
            Element::new("span")
                .with_classes(["annotation-text"])
                .with_html(annotation.text()),
        );

        // rescan for embedded math in the new node
        self.typesets += 1;
        root
    }

    /// Builds the header: meta, visibility, notice, edit and transition
    /// controls, in that order.
    fn header(&self, annotation: &Annotation) -> Element {
        let locale = self.locale;
        let mut header = Element::new("div").with_classes(["annotation-header"]);

        let mut meta = Element::new("span")
            .with_classes(["annotation-meta"])
            .with_text(annotation.meta(locale));
        if !annotation.visible() {
            meta.push(
                Element::new("i")
                    .with_classes(["mdi", "mdi-eye-off", "mdi-18", "annotation-visibility"])
                    .with_attr("title", locale.not_released()),
            );
        }
        header.push(meta);

        if let Some(notice) = annotation.notice(locale) {
            let link = Element::new("a")
                .with_classes(["annotation-notice"])
                .with_attr("href", notice.url)
                .with_attr("data-action", "notice");
            let link = match notice.style {
                NoticeStyle::Icon(tooltip) => link.with_child(
                    Element::new("i")
                        .with_classes(["mdi", "mdi-information-outline", "mdi-18"])
                        .with_attr("title", tooltip),
                ),
                NoticeStyle::Text(text) => link.with_text(text),
            };
            header.push(link);
        }

        if annotation.modifiable() {
            header.push(
                control("annotation-control-button", "edit", "mdi-pencil")
                    .with_classes(["annotation-edit"])
                    .with_attr("title", annotation.edit_title(locale)),
            );
        }

        // TODO: drop the beta gate once saved annotations leave beta
        if self.beta && annotation.savable() {
            header.push(
                control("annotation-control-button", "save", "mdi-content-save-outline")
                    .with_classes(["annotation-save"])
                    .with_attr("title", locale.save_annotation()),
            );
            header.push(saved_indicator(annotation.saved_annotation_id(), locale));
        }

        for target in QuestionState::TRANSITION_TARGETS {
            if annotation.transitionable(target) {
                header.push(
                    control("question-control-button", "transition", target.icon())
                        .with_classes([format!("question-{}", target.as_str())])
                        .with_attr("data-target", target.as_str())
                        .with_attr("title", locale.transition_title(target)),
                );
            }
        }

        header
    }
}

/// Builds an icon button wired to `action`.
fn control(kind: &str, action: &str, icon: &str) -> Element {
    Element::new("a")
        .with_classes(["btn", "btn-icon", kind])
        .with_attr("data-action", action)
        .with_child(Element::new("i").with_classes(["mdi", icon]))
}

/// Builds the saved-annotation indicator; hidden while not linked.
fn saved_indicator(saved: Option<u64>, locale: Locale) -> Element {
    let mut indicator = Element::new("span")
        .with_classes(["saved-annotation-indicator"])
        .with_attr("title", locale.saved())
        .with_child(Element::new("i").with_classes(["mdi", "mdi-link-variant", "mdi-18"]));
    match saved {
        Some(id) => indicator.set_attr("data-saved-annotation-id", id.to_string()),
        None => indicator.add_class(HIDE_CLASS),
    }
    indicator
}

/// Html id of an annotation view.
pub fn view_id(id: AnnotationId) -> String {
    format!("annotation-div-{id}")
}

/// Memoized views, one per live annotation.
#[derive(Debug, Default)]
pub struct ViewCache {
    /// Built views.
    views:    HashMap<AnnotationId, Element>,
    /// Builder for missing views.
    renderer: AnnotationRenderer,
}

impl ViewCache {
    /// Creates an empty cache.
    pub fn new(renderer: AnnotationRenderer) -> Self {
        Self {
            views: HashMap::new(),
            renderer,
        }
    }

    /// Returns the view of an annotation, building it on first access only.
    pub fn html(&mut self, annotation: &Annotation) -> &Element {
        let Self { views, renderer } = self;
        views
            .entry(annotation.id())
            .or_insert_with(|| renderer.build(annotation))
    }

    /// Returns an already built view.
    pub fn get(&self, id: AnnotationId) -> Option<&Element> {
        self.views.get(&id)
    }

    /// Mutable access to an already built view.
    pub fn get_mut(&mut self, id: AnnotationId) -> Option<&mut Element> {
        self.views.get_mut(&id)
    }

    /// Drops a view so the next access rebuilds it.
    pub fn invalidate(&mut self, id: AnnotationId) -> Option<Element> {
        self.views.remove(&id)
    }

    /// Discards any cached view and builds a fresh one, keeping the hidden
    /// state of the old one.
    pub fn rebuild(&mut self, annotation: &Annotation) -> &Element {
        let hidden = self.is_hidden(annotation.id());
        self.views.remove(&annotation.id());
        let mut view = self.renderer.build(annotation);
        if hidden {
            view.add_class(HIDE_CLASS);
        }
        self.views.insert(annotation.id(), view);
        self.html(annotation)
    }

    /// Shows a built view.
    pub fn show(&mut self, id: AnnotationId) {
        if let Some(view) = self.views.get_mut(&id) {
            view.remove_class(HIDE_CLASS);
        }
    }

    /// Hides a built view.
    pub fn hide(&mut self, id: AnnotationId) {
        if let Some(view) = self.views.get_mut(&id) {
            view.add_class(HIDE_CLASS);
        }
    }

    /// Whether a built view is hidden.
    pub fn is_hidden(&self, id: AnnotationId) -> bool {
        self.views.get(&id).is_some_and(|view| view.has_class(HIDE_CLASS))
    }

    /// Detaches a view.
    pub fn remove(&mut self, id: AnnotationId) {
        self.views.remove(&id);
    }

    /// Updates the saved-annotation indicator of a built view in place.
    pub fn set_saved(&mut self, id: AnnotationId, saved: Option<u64>) {
        let Some(indicator) = self
            .views
            .get_mut(&id)
            .and_then(|view| view.find_by_class_mut("saved-annotation-indicator"))
        else {
            return;
        };
        match saved {
            Some(saved) => {
                indicator.remove_class(HIDE_CLASS);
                indicator.set_attr("data-saved-annotation-id", saved.to_string());
            }
            None => indicator.add_class(HIDE_CLASS),
        }
    }

    /// Header controls of a built view, in rendering order.
    pub fn actions(&self, id: AnnotationId) -> Vec<HeaderAction> {
        self.views
            .get(&id)
            .and_then(|view| view.find_by_class("annotation-header"))
            .map(|header| {
                header
                    .children()
                    .iter()
                    .filter_map(HeaderAction::from_element)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of built views.
    pub fn len(&self) -> usize {
        self.views.len()
    }

    /// Whether no view is built.
    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// Number of math rescans requested so far.
    pub fn typesets(&self) -> usize {
        self.renderer.typesets()
    }

    /// Language of generated strings.
    pub fn locale(&self) -> Locale {
        self.renderer.locale()
    }
}
