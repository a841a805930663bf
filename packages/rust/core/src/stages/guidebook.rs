//! Listing guidebook content: intro text, posting calendar, review prompts
//! and the compliance lint.

use serde::Serialize;
use serde_json::Value;

use placeseo_taxonomy::dedupe;

use crate::artifact::{str_at, strings_at};

/// Appended until the intro reaches its minimum length.
const INTRO_FILLER: &str =
    "\n추가 안내: 실제 제공 콘텐츠와 운영 정보는 현장과 안내 페이지의 최신 내용을 기준으로 검토하여 반영합니다.";

/// Headings a guidebook-conformant intro mentions.
const STRUCTURE_HINTS: [&str; 6] = [
    "대표 서비스",
    "예약/이용",
    "운영 정보",
    "찾아오시는 길",
    "스토리",
    "마무리",
];

/// Exaggerated or unverifiable claims.
const PROHIBITED_PHRASES: [&str; 11] = [
    "최고",
    "완벽",
    "무조건",
    "보장",
    "전국 1위",
    "압도적",
    "절대",
    "무한",
    "완전",
    "특가 보장",
    "상시 할인",
];

const NEWS_THEMES: [&str; 4] = ["지역 소식", "메뉴 소개", "이벤트/공지", "후기 하이라이트"];

const NEWS_IDEAS: [&str; 4] = [
    "시즌 한정 메뉴 사진과 간단한 소개",
    "근처 랜드마크와 함께하는 방문 동선 팁",
    "포장/예약 이용 팁",
    "고객 후기 1문장 인용(사실 기반)",
];

// ---------------------------------------------------------------------------
// Intro
// ---------------------------------------------------------------------------

/// The seven blocks of a listing intro, in display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntroSections {
    pub brand_intro: String,
    pub services: String,
    pub usage: String,
    pub operations: String,
    pub directions: String,
    pub story: String,
    pub closing: String,
}

impl IntroSections {
    /// Fill the blocks from an analysis document's business data and keywords.
    pub fn from_document(doc: &Value) -> Self {
        let name = Some(str_at(doc, "/client/business/name"))
            .filter(|n| !n.is_empty())
            .unwrap_or("매장");
        let category = str_at(doc, "/client/business/category/primary");
        let address = str_at(doc, "/client/business/address/raw");
        let phone = str_at(doc, "/client/business/phone");

        let keywords = dedupe(
            strings_at(doc, "/keywords/core")
                .into_iter()
                .take(3)
                .chain(strings_at(doc, "/keywords/region").into_iter().take(3))
                .chain(strings_at(doc, "/keywords/attributes").into_iter().take(5)),
        )
        .join(", ");

        let category_part = if category.is_empty() {
            String::new()
        } else {
            format!("{category} 카테고리의 ")
        };
        let mut services = format!(
            "대표 서비스/상품은 매장 상황에 따라 달라질 수 있으며, 방문 전 문의 부탁드립니다. 핵심 키워드: {keywords}"
        );
        if let Some(extra) = category_note(category) {
            services.push(' ');
            services.push_str(extra);
        }

        Self {
            brand_intro: format!(
                "{name}는(은) {category_part}공간으로, 지역 고객에게 일상 속 작은 만족을 드리기 위해 노력합니다."
            ),
            services,
            usage: format!(
                "예약/이용: 전화({phone}) 또는 현장 접수 가능합니다. 혼잡 시간대에는 대기 안내가 있을 수 있습니다."
            ),
            operations: format!(
                "운영 정보: 주소 {address}. 영업시간/휴무일/결제수단은 현장 안내를 참고해 주세요."
            ),
            directions: "찾아오시는 길: 주변 랜드마크 및 대중교통 정보를 기반으로 편리한 동선을 안내드립니다."
                .into(),
            story: "스토리: 고객의 일상에 어울리는 경험을 만들기 위해 세심함을 지향합니다.".into(),
            closing: "마무리: 오늘도 편안한 방문이 되시길 바랍니다.".into(),
        }
    }

    /// Blocks separated by blank lines, padded to at least `min_chars` characters.
    pub fn compose(&self, min_chars: usize) -> String {
        let mut text = [
            &self.brand_intro,
            &self.services,
            &self.usage,
            &self.operations,
            &self.directions,
            &self.story,
            &self.closing,
        ]
        .map(String::as_str)
        .join("\n\n");

        let mut len = text.chars().count();
        let filler_len = INTRO_FILLER.chars().count();
        while len < min_chars {
            text.push_str(INTRO_FILLER);
            len += filler_len;
        }
        text
    }
}

/// Extra services sentence for categories with specific disclosure needs.
fn category_note(category: &str) -> Option<&'static str> {
    let has = |words: &[&str]| words.iter().any(|w| category.contains(w));
    if has(&["음식", "식당", "카페"]) {
        Some("메뉴/재료/조리 방식에 대한 안내는 현장 메뉴판과 사진을 함께 확인해 주세요.")
    } else if has(&["미용", "뷰티"]) {
        Some("위생/시술 안내는 상담 후 결정되며, 개인별 차이를 고려해 안내됩니다.")
    } else if has(&["병원", "의원", "한의원"]) {
        Some("의료·건강 관련 정보는 사실 기반으로만 제공하며, 과장/추정 서술을 지양합니다.")
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Calendar, reviews, visuals
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewsItem {
    pub week: u32,
    pub theme: String,
    pub ideas: Vec<String>,
}

/// Four weekly posting themes, each with the same idea bank.
pub fn news_calendar() -> Vec<NewsItem> {
    NEWS_THEMES
        .iter()
        .zip(1..)
        .map(|(theme, week)| NewsItem {
            week,
            theme: (*theme).to_string(),
            ideas: NEWS_IDEAS.iter().map(|s| s.to_string()).collect(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewTemplate {
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
}

pub fn review_templates() -> Vec<ReviewTemplate> {
    vec![
        ReviewTemplate {
            kind: "short".into(),
            content: "방문 감사합니다! 어떤 점이 가장 만족스러우셨나요?".into(),
        },
        ReviewTemplate {
            kind: "detail".into(),
            content: "메뉴/서비스/분위기 중 특히 좋았던 점을 알려주세요.".into(),
        },
    ]
}

pub fn visual_suggestions(has_photos: bool) -> Vec<String> {
    let mut suggestions = Vec::new();
    if !has_photos {
        suggestions.push("대표 사진 5장 이상 업로드".to_string());
    }
    suggestions.extend(
        [
            "메뉴/실내/조리/가격표/비교컷 구분 촬영",
            "파일명 규칙: 지역_메뉴_속성_번호.jpg (예: 강남_비빔밥_대표_01.jpg)",
            "중복/저해상도/과도한 보정 사진 제외",
        ]
        .map(String::from),
    );
    suggestions
}

// ---------------------------------------------------------------------------
// Lint
// ---------------------------------------------------------------------------

/// Result of [`GuidebookLint::check`], stored as `analysis.guidebook_compliance`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Compliance {
    pub ok: bool,
    pub issues: Vec<String>,
}

/// Checks intro text against the listing guidebook.
#[derive(Debug, Clone, Copy)]
pub struct GuidebookLint {
    min_chars: usize,
    max_chars: usize,
}

impl Default for GuidebookLint {
    fn default() -> Self {
        Self::new(1200, 2200)
    }
}

impl GuidebookLint {
    pub fn new(min_chars: usize, max_chars: usize) -> Self {
        Self {
            min_chars,
            max_chars,
        }
    }

    pub fn check(&self, text: &str) -> Compliance {
        let mut issues = Vec::new();

        let len = text.chars().count();
        if len < self.min_chars {
            issues.push(format!("분량 부족(<{}자)", self.min_chars));
        }
        if len > self.max_chars {
            issues.push(format!("분량 과다(>{}자)", self.max_chars));
        }

        let missing: Vec<&str> = STRUCTURE_HINTS
            .into_iter()
            .filter(|hint| !text.contains(hint))
            .collect();
        if !missing.is_empty() {
            issues.push(format!("권장 구조 키워드 일부 미포함: {}", missing.join(", ")));
        }

        let prohibited: Vec<&str> = PROHIBITED_PHRASES
            .into_iter()
            .filter(|phrase| text.contains(phrase))
            .collect();
        if !prohibited.is_empty() {
            issues.push(format!("과장/금지어 포함: {}", prohibited.join(", ")));
        }

        if !text.chars().any(|c| ('가'..='힣').contains(&c)) {
            issues.push("한글 비중 부족(한국어 사용자 대상)".into());
        }

        Compliance {
            ok: issues.is_empty(),
            issues,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn analysis(category: &str) -> Value {
        json!({
            "client": { "business": {
                "name": "카페 모리",
                "phone": "02-123-4567",
                "address": { "raw": "서울 마포구 연남동 123-4" },
                "category": { "primary": category }
            }},
            "keywords": {
                "core": ["카페"],
                "region": ["서울", "마포구", "연남동", "123"],
                "attributes": ["라떼", "카페"]
            }
        })
    }

    #[test]
    fn sections_use_business_data() {
        let sections = IntroSections::from_document(&analysis("카페"));
        assert!(sections.brand_intro.starts_with("카페 모리는(은) 카페 카테고리의 공간으로"));
        assert!(sections.services.ends_with("현장 메뉴판과 사진을 함께 확인해 주세요."));
        assert!(sections.services.contains("핵심 키워드: 카페, 서울, 마포구, 연남동, 라떼"));
        assert!(sections.usage.contains("전화(02-123-4567)"));
        assert!(sections.operations.contains("주소 서울 마포구 연남동 123-4."));
    }

    #[test]
    fn category_specific_sentence() {
        let beauty = IntroSections::from_document(&analysis("뷰티샵"));
        assert!(beauty.services.contains("위생/시술 안내"));
        let clinic = IntroSections::from_document(&analysis("한의원"));
        assert!(clinic.services.contains("의료·건강 관련 정보"));
        let other = IntroSections::from_document(&analysis("세탁소"));
        assert!(other.services.ends_with("라떼"));
    }

    #[test]
    fn empty_business_uses_placeholders() {
        let sections = IntroSections::from_document(&json!({}));
        assert!(sections.brand_intro.starts_with("매장는(은) 공간으로"));
        assert!(sections.services.ends_with("핵심 키워드: "));
    }

    #[test]
    fn composed_intro_reaches_minimum_and_passes_lint() {
        let text = IntroSections::from_document(&analysis("카페")).compose(1200);
        assert!(text.chars().count() >= 1200);
        assert!(text.contains("\n\n예약/이용"));
        assert!(text.ends_with(INTRO_FILLER));

        let compliance = GuidebookLint::default().check(&text);
        assert!(compliance.ok, "{:?}", compliance.issues);
    }

    #[test]
    fn compose_without_minimum_is_unpadded() {
        let text = IntroSections::from_document(&analysis("카페")).compose(0);
        assert!(!text.contains("추가 안내"));
        assert!(text.starts_with("카페 모리"));
        assert!(text.ends_with("마무리: 오늘도 편안한 방문이 되시길 바랍니다."));
    }

    #[test]
    fn lint_reports_every_problem() {
        let compliance = GuidebookLint::default().check("best cafe, 최고 완벽");
        assert!(!compliance.ok);
        assert_eq!(compliance.issues[0], "분량 부족(<1200자)");
        assert!(compliance.issues[1].starts_with("권장 구조 키워드 일부 미포함: 대표 서비스"));
        assert_eq!(compliance.issues[2], "과장/금지어 포함: 최고, 완벽");
        assert_eq!(compliance.issues.len(), 3);

        let english = GuidebookLint::new(0, 10).check("hello world, long text");
        assert!(english.issues.contains(&"분량 과다(>10자)".to_string()));
        assert!(english.issues.contains(&"한글 비중 부족(한국어 사용자 대상)".to_string()));
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let text = "가".repeat(1200);
        let compliance = GuidebookLint::default().check(&text);
        assert!(!compliance.issues.iter().any(|i| i.starts_with("분량")));
    }

    #[test]
    fn calendar_and_suggestions() {
        let calendar = news_calendar();
        assert_eq!(calendar.len(), 4);
        assert_eq!(calendar[0].week, 1);
        assert_eq!(calendar[3].theme, "후기 하이라이트");
        assert_eq!(calendar[2].ideas.len(), 4);

        assert_eq!(visual_suggestions(false)[0], "대표 사진 5장 이상 업로드");
        assert_eq!(visual_suggestions(true).len(), 3);

        let value = serde_json::to_value(review_templates()).unwrap();
        assert_eq!(value[0]["type"], "short");
        assert_eq!(value[1]["type"], "detail");
    }
}
