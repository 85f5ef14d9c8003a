//! Newline-delimited JSON event output.
//!
//! Each listener callback becomes one JSON object on its own line, tagged
//! with an `event` field. Write failures cannot be returned from a listener
//! callback, so the first one is kept and reported by
//! [`JsonLinesListener::take_error`].

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::{Arc, Mutex};

use multisearch_core::{ContributorInfo, Correction, FoundItem, HasMoreMap, ItemId, SearchListener};
use serde::Serialize;

#[derive(Serialize)]
struct ItemView<'a, T> {
    id: ItemId,
    element: &'a T,
    priority: i32,
    contributor: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    correction: Option<&'a Correction>,
}

impl<'a, T> ItemView<'a, T> {
    fn from_item(item: &'a FoundItem<T>) -> Self {
        Self {
            id: item.id(),
            element: &item.element,
            priority: item.priority,
            contributor: item.contributor_id().as_str(),
            correction: item.correction.as_ref(),
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum Line<'a, T> {
    SearchStarted {
        pattern_len: usize,
        contributors: &'a [ContributorInfo],
    },
    ElementsAdded {
        items: Vec<ItemView<'a, T>>,
    },
    ElementsRemoved {
        items: Vec<ItemView<'a, T>>,
    },
    ContributorWaits {
        contributor: &'a str,
    },
    ContributorFinished {
        contributor: &'a str,
        has_more: bool,
    },
    FirstResultsReady,
    SearchFinished {
        has_more: BTreeMap<&'a str, bool>,
    },
    SearchCancelled,
}

/// Writes every event as one JSON line to `W`.
pub struct JsonLinesListener<W> {
    writer: Mutex<W>,
    error: Mutex<Option<String>>,
}

impl<W: Write> JsonLinesListener<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            error: Mutex::new(None),
        }
    }

    /// The first write or serialization failure, if any.
    pub fn take_error(&self) -> Option<String> {
        self.error.lock().unwrap_or_else(|e| e.into_inner()).take()
    }

    fn write<T: Serialize>(&self, line: &Line<'_, T>) {
        let result = serde_json::to_string(line)
            .map_err(|e| e.to_string())
            .and_then(|json| {
                let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
                writeln!(writer, "{json}")
                    .and_then(|()| writer.flush())
                    .map_err(|e| e.to_string())
            });
        if let Err(error) = result {
            tracing::warn!(%error, "failed to write event");
            let mut slot = self.error.lock().unwrap_or_else(|e| e.into_inner());
            slot.get_or_insert(error);
        }
    }
}

fn views<T>(items: &[Arc<FoundItem<T>>]) -> Vec<ItemView<'_, T>> {
    items.iter().map(|item| ItemView::from_item(item)).collect()
}

impl<W, T> SearchListener<T> for JsonLinesListener<W>
where
    W: Write + Send,
    T: Serialize + Send + Sync,
{
    fn search_started(&self, pattern: &str, contributors: &[ContributorInfo]) {
        self.write::<T>(&Line::SearchStarted {
            pattern_len: pattern.chars().count(),
            contributors,
        });
    }

    fn elements_added(&self, items: &[Arc<FoundItem<T>>]) {
        self.write(&Line::ElementsAdded {
            items: views(items),
        });
    }

    fn elements_removed(&self, items: &[Arc<FoundItem<T>>]) {
        self.write(&Line::ElementsRemoved {
            items: views(items),
        });
    }

    fn contributor_waits(&self, contributor: &ContributorInfo) {
        self.write::<T>(&Line::ContributorWaits {
            contributor: contributor.id.as_str(),
        });
    }

    fn contributor_finished(&self, contributor: &ContributorInfo, has_more: bool) {
        self.write::<T>(&Line::ContributorFinished {
            contributor: contributor.id.as_str(),
            has_more,
        });
    }

    fn first_results_ready(&self) {
        self.write::<T>(&Line::FirstResultsReady);
    }

    fn search_finished(&self, has_more: &HasMoreMap) {
        self.write::<T>(&Line::SearchFinished {
            has_more: has_more
                .iter()
                .map(|(id, more)| (id.as_str(), *more))
                .collect(),
        });
    }

    fn search_cancelled(&self) {
        self.write::<T>(&Line::SearchCancelled);
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use multisearch_core::ContributorId;

    fn lines(listener: JsonLinesListener<Vec<u8>>) -> Vec<serde_json::Value> {
        let bytes = listener.writer.into_inner().unwrap();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn writes_one_tagged_line_per_event() {
        let listener = JsonLinesListener::new(Vec::new());
        let info = ContributorInfo::new("files", 3);
        let item = Arc::new(FoundItem::new("main.rs".to_string(), 7, info.clone()));

        SearchListener::<String>::search_started(&listener, "main", std::slice::from_ref(&info));
        listener.elements_added(&[Arc::clone(&item)]);
        SearchListener::<String>::contributor_finished(&listener, &info, true);
        let mut has_more = HasMoreMap::new();
        has_more.insert(ContributorId::new("files"), true);
        SearchListener::<String>::search_finished(&listener, &has_more);

        let lines = lines(listener);
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0]["event"], "search_started");
        assert_eq!(lines[0]["pattern_len"], 4);
        assert_eq!(lines[0]["contributors"][0]["id"], "files");
        assert_eq!(lines[1]["event"], "elements_added");
        assert_eq!(lines[1]["items"][0]["element"], "main.rs");
        assert_eq!(lines[1]["items"][0]["priority"], 7);
        assert_eq!(lines[1]["items"][0]["contributor"], "files");
        assert!(lines[1]["items"][0].get("correction").is_none());
        assert_eq!(lines[2]["has_more"], true);
        assert_eq!(lines[3]["has_more"]["files"], true);
    }

    #[test]
    fn cancellation_is_one_line() {
        let listener = JsonLinesListener::new(Vec::new());
        SearchListener::<String>::search_cancelled(&listener);
        let lines = lines(listener);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["event"], "search_cancelled");
    }

    #[test]
    fn pattern_text_is_never_written() {
        let listener = JsonLinesListener::new(Vec::new());
        SearchListener::<String>::search_started(&listener, "secret-query", &[]);
        let text = String::from_utf8(listener.writer.into_inner().unwrap()).unwrap();
        assert!(!text.contains("secret-query"));
    }

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn first_write_error_is_kept() {
        let listener = JsonLinesListener::new(Broken);
        SearchListener::<String>::first_results_ready(&listener);
        SearchListener::<String>::first_results_ready(&listener);
        let error = listener.take_error().expect("error recorded");
        assert!(error.contains("closed"));
        assert!(listener.take_error().is_none());
    }
}
