// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Informational page content: market chart, gallery and news feed

use crate::figure::{
    Axis, Bar, BarMarker, ColorAxis, ColorBar, Figure, Font, Layout, Title, Trace, TRANSPARENT,
};
use serde::Serialize;

/// Global 3D printing market size, billion USD
pub const MARKET_GROWTH: [(u16, f64); 8] = [
    (2018, 9.9),
    (2019, 11.5),
    (2020, 12.6),
    (2021, 15.2),
    (2022, 18.3),
    (2023, 22.4),
    (2024, 26.8),
    (2025, 32.5),
];

const MARKET_AXIS: &str = "Market Size (Billion USD)";

/// Bar chart of [`MARKET_GROWTH`], bars coloured on a teal scale by value
pub fn market_chart() -> Figure {
    let x = MARKET_GROWTH.iter().map(|&(year, _)| f64::from(year)).collect();
    let y: Vec<f64> = MARKET_GROWTH.iter().map(|&(_, size)| size).collect();

    Figure {
        data: vec![Trace::Bar(Bar {
            x,
            y: y.clone(),
            name: MARKET_AXIS.to_string(),
            marker: BarMarker {
                color: y,
                coloraxis: "coloraxis".to_string(),
            },
        })],
        layout: Layout {
            title: Some(Title::new("Global 3D Printing Market Growth")),
            xaxis: Some(Axis::titled("Year")),
            yaxis: Some(Axis::titled(MARKET_AXIS)),
            coloraxis: Some(ColorAxis {
                colorscale: "Teal".to_string(),
                colorbar: ColorBar {
                    title: Title::new(MARKET_AXIS),
                },
            }),
            font: Some(Font {
                color: "white".to_string(),
            }),
            paper_bgcolor: Some(TRANSPARENT.to_string()),
            plot_bgcolor: Some(TRANSPARENT.to_string()),
            ..Layout::default()
        },
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GalleryImage {
    pub url: &'static str,
    pub caption: &'static str,
}

pub const GALLERY: [GalleryImage; 3] = [
    GalleryImage {
        url: "https://images.unsplash.com/photo-1581094794329-c8112a89af12?q=80&w=600&auto=format&fit=crop",
        caption: "Past: Manual Drafting",
    },
    GalleryImage {
        url: "https://images.unsplash.com/photo-1611162617474-5b21e879e113?q=80&w=600&auto=format&fit=crop",
        caption: "Present: Parametric CAD",
    },
    GalleryImage {
        url: "https://images.unsplash.com/photo-1635070041078-e363dbe005cb?q=80&w=600&auto=format&fit=crop",
        caption: "Future: AI Generative",
    },
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Highlight {
    pub title: &'static str,
    pub text: &'static str,
}

pub const FUTURE_INTRO: &str = "Computer-Aided Design (CAD) is undergoing a massive shift. \
We are moving away from explicitly drawing lines and arcs (Parametric) toward describing \
goals and constraints (Generative).";

pub const FUTURE_HIGHLIGHTS: [Highlight; 3] = [
    Highlight {
        title: "Generative Design",
        text: "The computer explores thousands of iterations to find the optimal strength-to-weight ratio.",
    },
    Highlight {
        title: "AI Integration",
        text: "Tools like \"Text-to-3D\" allow rapid concepting before engineering begins.",
    },
    Highlight {
        title: "Digital Twins",
        text: "Real-time simulation of parts before they are ever physically printed.",
    },
];

pub const FUTURE_TIP: &str = "💡 Did you know? AI-driven topology optimization can reduce \
part weight by 40% while maintaining structural integrity.";

/// One news card
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Article {
    pub title: String,
    pub desc: String,
    pub tag: String,
}

impl Article {
    pub fn new(title: &str, desc: &str, tag: &str) -> Self {
        Self {
            title: title.to_string(),
            desc: desc.to_string(),
            tag: tag.to_string(),
        }
    }
}

/// Supplies the news page
pub trait NewsSource: Send + Sync {
    fn articles(&self) -> Vec<Article>;
}

/// Built-in curated feed
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticNews;

impl NewsSource for StaticNews {
    fn articles(&self) -> Vec<Article> {
        vec![
            Article::new(
                "Ultimaker announces S7 Pro Bundle",
                "The new flagship printer features integrated material handling and air filtration.",
                "Hardware",
            ),
            Article::new(
                "Bambu Lab disrupts consumer market",
                "High-speed coreXY systems are making advanced prototyping accessible to hobbyists.",
                "Market",
            ),
            Article::new(
                "NASA uses 3D Printing for Rocket Nozzles",
                "New copper alloys allow for heat resistance previously impossible with casting.",
                "Aerospace",
            ),
            Article::new(
                "AI in Slicing: The end of support failure?",
                "New algorithms predict overhang failure and adjust cooling automatically.",
                "Software",
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_market_chart() {
        let value = serde_json::to_value(market_chart()).unwrap();
        let bar = &value["data"][0];
        assert_eq!(bar["type"], "bar");
        assert_eq!(bar["x"][0], 2018.0);
        assert_eq!(bar["y"][7], 32.5);
        assert_eq!(bar["marker"]["color"], bar["y"]);
        assert_eq!(value["layout"]["coloraxis"]["colorscale"], "Teal");
        assert_eq!(value["layout"]["font"], json!({"color": "white"}));
        assert_eq!(value["layout"]["plot_bgcolor"], "rgba(0,0,0,0)");
        assert!(value["layout"].get("scene").is_none());
    }

    #[test]
    fn test_market_grows_every_year() {
        assert!(MARKET_GROWTH.windows(2).all(|w| w[1].0 == w[0].0 + 1 && w[1].1 > w[0].1));
    }

    #[test]
    fn test_static_news() {
        let articles = StaticNews.articles();
        assert_eq!(articles.len(), 4);
        let tags: Vec<&str> = articles.iter().map(|a| a.tag.as_str()).collect();
        assert_eq!(tags, ["Hardware", "Market", "Aerospace", "Software"]);
    }
}
