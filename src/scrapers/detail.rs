use crate::error::ExtractError;
use crate::scrapers::funda::{compile, text_of};
use scraper::{Html, Selector};

const STATUS_LABEL: &str = "Status";

/// Status information shown on a listing's detail page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailStatus {
    /// Value of the "Status" entry in the feature list
    pub status: Option<String>,
    /// Header badges, in page order
    pub labels: Vec<String>,
    /// Highlight ("blikvanger") badge text
    pub eye_catcher: Option<String>,
}

pub struct DetailParser {
    definitions: Selector,
    labels: Selector,
    eye_catcher: Selector,
}

impl DetailParser {
    pub fn new() -> Result<Self, ExtractError> {
        Ok(Self {
            definitions: compile("dt, dd")?,
            labels: compile("div.object-header__labels li")?,
            eye_catcher: compile("span.label-blikvanger")?,
        })
    }

    pub fn parse(&self, html: &str) -> DetailStatus {
        let document = Html::parse_document(html);

        // the value is the first <dd> after the "Status" <dt>
        let mut status = None;
        let mut after_label = false;
        for el in document.select(&self.definitions) {
            let is_term = el.value().name() == "dt";
            if after_label && !is_term {
                status = Some(text_of(el));
                break;
            }
            if is_term && text_of(el) == STATUS_LABEL {
                after_label = true;
            }
        }

        let labels = document
            .select(&self.labels)
            .map(text_of)
            .filter(|l| !l.is_empty())
            .collect();

        let eye_catcher = document
            .select(&self.eye_catcher)
            .next()
            .map(text_of)
            .filter(|t| !t.is_empty());

        DetailStatus {
            status,
            labels,
            eye_catcher,
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    /// Detail page markup with an optional status entry, header labels and highlight badge
    pub fn detail_page(status: Option<&str>, labels: &[&str], eye_catcher: Option<&str>) -> String {
        let status = status
            .map(|s| format!("<dt>Status</dt><dd><span>{}</span></dd>", s))
            .unwrap_or_default();
        let labels = if labels.is_empty() {
            String::new()
        } else {
            let items: String = labels.iter().map(|l| format!("<li>{}</li>", l)).collect();
            format!(r#"<div class="object-header__labels"><ul>{}</ul></div>"#, items)
        };
        let eye_catcher = eye_catcher
            .map(|t| format!(r#"<span class="label-blikvanger">{}</span>"#, t))
            .unwrap_or_default();

        format!(
            r#"<html><body>
                <header>{labels}{eye_catcher}</header>
                <section class="object-kenmerken">
                    <dl>
                        <dt>Vraagprijs</dt><dd>€ 450.000 k.k.</dd>
                        <dt>Aangeboden sinds</dt><dd>3 weken</dd>
                        {status}
                        <dt>Aanvaarding</dt><dd>In overleg</dd>
                    </dl>
                </section>
            </body></html>"#,
            labels = labels,
            eye_catcher = eye_catcher,
            status = status,
        )
    }
}
