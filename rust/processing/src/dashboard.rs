// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Dashboard state and page view models
//!
//! The state is a value: every input event produces a new state, and the
//! page to show is a pure function of it.

use crate::content::{
    market_chart, Article, GalleryImage, Highlight, NewsSource, FUTURE_HIGHLIGHTS, FUTURE_INTRO,
    FUTURE_TIP, GALLERY,
};
use crate::context::{validate_nozzle, PrinterConfig, NOZZLE_RANGE, STEP_EXTENSIONS};
use crate::error::ConfigError;
use crate::figure::Figure;
use curiosity_formats::MeshFormat;
use serde::{Deserialize, Serialize};

pub const BRAND: &str = "CURIOSITY 3D";
pub const BRAND_CAPTION: &str = "Engineering & Education Hub";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Page {
    #[default]
    Converter,
    Future,
    News,
}

impl Page {
    pub const ALL: [Page; 3] = [Page::Converter, Page::Future, Page::News];

    pub fn slug(self) -> &'static str {
        match self {
            Page::Converter => "converter",
            Page::Future => "future",
            Page::News => "news",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Page> {
        Self::ALL.into_iter().find(|page| page.slug() == slug)
    }

    /// Navigation entry
    pub fn nav_label(self) -> &'static str {
        match self {
            Page::Converter => "🛠️ Converter Tool",
            Page::Future => "🚀 Future of CAD",
            Page::News => "📰 Industry News",
        }
    }
}

/// Everything the dashboard remembers between interactions
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DashboardState {
    pub page: Page,
    pub printer: PrinterConfig,
}

/// One input control changed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum DashboardEvent {
    SelectPage(Page),
    SetNozzle(f64),
    SetExportFormat(MeshFormat),
}

impl DashboardState {
    /// New state after an event; the current state is left untouched
    pub fn apply(&self, event: DashboardEvent) -> Result<DashboardState, ConfigError> {
        let mut next = *self;
        match event {
            DashboardEvent::SelectPage(page) => next.page = page,
            DashboardEvent::SetNozzle(nozzle_mm) => {
                next.printer.nozzle_mm = validate_nozzle(nozzle_mm)?
            }
            DashboardEvent::SetExportFormat(format) => next.printer.export_format = format,
        }
        tracing::debug!(?event, page = next.page.slug(), "dashboard event applied");
        Ok(next)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavItem {
    pub page: Page,
    pub label: &'static str,
    pub selected: bool,
}

/// Rendered page: shared chrome plus the page body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageView {
    pub brand: &'static str,
    pub caption: &'static str,
    pub navigation: Vec<NavItem>,
    pub body: PageBody,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "page", rename_all = "lowercase")]
pub enum PageBody {
    Converter(ConverterView),
    Future(FutureView),
    News(NewsView),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormatOption {
    pub tag: &'static str,
    pub label: String,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrinterSpecs {
    pub header: &'static str,
    pub nozzle_mm: f64,
    pub nozzle_min: f64,
    pub nozzle_max: f64,
    pub formats: Vec<FormatOption>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConverterView {
    pub title: &'static str,
    pub subtitle: &'static str,
    pub upload_label: &'static str,
    pub accept: Vec<&'static str>,
    pub printer: PrinterSpecs,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FutureView {
    pub title: &'static str,
    pub subtitle: &'static str,
    pub intro: &'static str,
    pub highlights: Vec<Highlight>,
    pub tip: &'static str,
    pub chart: Figure,
    pub gallery_title: &'static str,
    pub gallery: Vec<GalleryImage>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewsView {
    pub title: &'static str,
    pub subtitle: &'static str,
    pub articles: Vec<Article>,
}

/// Page view for a state
pub fn render(state: &DashboardState, news: &dyn NewsSource) -> PageView {
    let body = match state.page {
        Page::Converter => PageBody::Converter(converter_view(&state.printer)),
        Page::Future => PageBody::Future(FutureView {
            title: "The Future of Prototyping",
            subtitle: "From Parametric Modeling to Generative AI",
            intro: FUTURE_INTRO,
            highlights: FUTURE_HIGHLIGHTS.to_vec(),
            tip: FUTURE_TIP,
            chart: market_chart(),
            gallery_title: "Evolution of Design",
            gallery: GALLERY.to_vec(),
        }),
        Page::News => PageBody::News(NewsView {
            title: "Curated Industry Insights",
            subtitle: "Stay updated with the latest in Additive Manufacturing.",
            articles: news.articles(),
        }),
    };

    PageView {
        brand: BRAND,
        caption: BRAND_CAPTION,
        navigation: Page::ALL
            .into_iter()
            .map(|page| NavItem {
                page,
                label: page.nav_label(),
                selected: page == state.page,
            })
            .collect(),
        body,
    }
}

fn converter_view(printer: &PrinterConfig) -> ConverterView {
    ConverterView {
        title: "Intelligent CAD Converter",
        subtitle: "Convert STEP files to printable meshes with instant DFM Analysis.",
        upload_label: "Upload STEP File",
        accept: STEP_EXTENSIONS.to_vec(),
        printer: PrinterSpecs {
            header: "Printer Specs",
            nozzle_mm: printer.nozzle_mm,
            nozzle_min: *NOZZLE_RANGE.start(),
            nozzle_max: *NOZZLE_RANGE.end(),
            formats: MeshFormat::ALL
                .into_iter()
                .map(|format| FormatOption {
                    tag: format.tag(),
                    label: format.label(),
                    selected: format == printer.export_format,
                })
                .collect(),
        },
    }
}
