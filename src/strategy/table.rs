//! Ordered host table mapping URL fragments to publisher strategies.
//!
//! Adding a publisher means adding a row. Rows are scanned top to bottom and
//! the first fragment contained in the (lowercased) URL wins.

use super::{HtmlScrape, RewriteOp, ScrapeTarget, Strategy, StrategyKind};
use crate::user_agent::SCHOLAR_REFERER;

/// One row of the host table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublisherRule {
    /// Lowercase substring looked for anywhere in the URL.
    pub fragment: &'static str,
    pub strategy: Strategy,
}

const CITATION_META: ScrapeTarget = ScrapeTarget::Css {
    selector: super::html::CITATION_PDF_SELECTOR,
    attribute: "content",
};

const DOI_TO_PDF: &[RewriteOp] = &[RewriteOp::Replace {
    from: "/doi/",
    to: "/doi/pdf/",
}];

const fn rule(fragment: &'static str, name: &'static str, kind: StrategyKind) -> PublisherRule {
    PublisherRule {
        fragment,
        strategy: Strategy { name, kind },
    }
}

const fn rewrite(fragment: &'static str, name: &'static str, ops: &'static [RewriteOp]) -> PublisherRule {
    rule(fragment, name, StrategyKind::PathRewrite(ops))
}

const fn scrape(fragment: &'static str, name: &'static str, target: ScrapeTarget) -> PublisherRule {
    rule(
        fragment,
        name,
        StrategyKind::HtmlScrape(HtmlScrape { target, then: &[] }),
    )
}

const fn meta(fragment: &'static str, name: &'static str) -> PublisherRule {
    scrape(fragment, name, CITATION_META)
}

/// Host table in match order.
pub const PUBLISHER_TABLE: &[PublisherRule] = &[
    rewrite(
        "biomedcentral.com/",
        "biomedcentral",
        &[RewriteOp::Replace {
            from: "/articles/",
            to: "/track/pdf/",
        }],
    ),
    meta("springer.com/", "springer"),
    rewrite(
        "sciencedirect.com/",
        "sciencedirect",
        &[RewriteOp::Append("/pdfft?isDTMRedir=true&download=true")],
    ),
    rule(
        "academia.edu/",
        "academia_edu",
        StrategyKind::HeaderSpoofedFetch {
            referer: SCHOLAR_REFERER,
        },
    ),
    rule(
        "wiley.com/",
        "wiley",
        StrategyKind::HtmlScrape(HtmlScrape {
            target: CITATION_META,
            then: &[RewriteOp::Replace {
                from: "/doi/pdf/",
                to: "/doi/pdfdirect/",
            }],
        }),
    ),
    scrape(
        "ncbi.nlm.nih.gov/",
        "ncbi",
        ScrapeTarget::Css {
            selector: r#"link[type="application/pdf"]"#,
            attribute: "href",
        },
    ),
    meta("scielo.org.za/", "scielo"),
    rewrite(
        "journals.plos.org/",
        "plos",
        &[
            RewriteOp::Replace {
                from: "/article?",
                to: "/article/file?",
            },
            RewriteOp::Append("&type=printable"),
        ],
    ),
    meta("ojvr.org/", "ojvr"),
    meta("cambridge.org/", "cambridge"),
    rewrite(
        "veterinaryworld.org/",
        "veterinary_world",
        &[RewriteOp::Replace {
            from: ".html",
            to: ".pdf",
        }],
    ),
    meta("hindawi.com/", "hindawi"),
    scrape("ejmanager", "ejmanager", ScrapeTarget::ScriptRedirect),
    rewrite(
        "scialert.net/",
        "scialert",
        &[
            RewriteOp::Replace {
                from: "/abstract/",
                to: "/qredirect.php",
            },
            RewriteOp::Append("&linkid=pdf"),
        ],
    ),
    scrape(
        "medwelljournals.",
        "medwell",
        ScrapeTarget::LinkText("Fulltext PDF"),
    ),
    meta("jidc.org/", "jidc"),
    meta("oup.com/", "oup"),
    meta("aem.asm.org/", "asm_aem"),
    meta("frontiersin.org/", "frontiers"),
    meta("indianjournals.com/", "indian_journals"),
    meta("springeropen.com/", "springer_open"),
    scrape(
        "tandfonline.com/",
        "tandf",
        ScrapeTarget::Css {
            selector: "a.show-pdf",
            attribute: "href",
        },
    ),
    scrape("ijpsr.com/", "ijpsr", ScrapeTarget::HrefSuffix(".pdf")),
    rewrite("liebertpub.com/", "liebert", DOI_TO_PDF),
    scrape(
        "ajtmh.org/",
        "ajtmh",
        ScrapeTarget::Css {
            selector: "a.pdf",
            attribute: "href",
        },
    ),
    rewrite(
        "panafrican-med-journal",
        "panafrican",
        &[
            RewriteOp::Replace {
                from: "/full/",
                to: "/pdf/",
            },
            RewriteOp::AppendSegment {
                from_end: 2,
                suffix: ".pdf",
            },
        ],
    ),
    rewrite("sagepub.com/", "sagepub", DOI_TO_PDF),
    rewrite("akademia.com/", "akademiai", DOI_TO_PDF),
    meta("ajol.info/", "ajol"),
    rewrite("jfoodprotection.org/", "jfood_protection", DOI_TO_PDF),
    meta("jsava.co.za/", "jsava"),
    meta("bioone.org/", "bioone"),
    meta("humankinetics.com/", "human_kinetics"),
    meta("cdc.gov/", "cdc"),
    meta("ekb.eg/", "ekb"),
    scrape(
        "microbiologyresearch.org/",
        "microbiology_research",
        ScrapeTarget::Css {
            selector: "div.ft-download-content.ft-download-content--pdf form",
            attribute: "action",
        },
    ),
];

/// First table row whose fragment occurs in `url`, compared case-insensitively.
#[must_use]
pub fn match_host(url: &str) -> Option<&'static PublisherRule> {
    let lowered = url.to_ascii_lowercase();
    PUBLISHER_TABLE
        .iter()
        .find(|rule| lowered.contains(rule.fragment))
}
