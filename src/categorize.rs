//! Keyword-based category assignment.

use crate::models::Category;

const AUTOMOTIVE_KEYWORDS: &[&str] = &[
    "car", "auto", "vehicle", "자동차", "차량", "승용차", "트럭", "버스", "현대", "기아", "삼성",
    "테슬라", "tesla", "hyundai", "kia", "전기차", "ev", "electric", "수소차", "hydrogen", "엔진",
    "모터", "배터리", "충전", "주행", "운전", "폴드", "fold", "갤럭시", "galaxy", "스마트폰",
    "smartphone",
];

const ECONOMY_KEYWORDS: &[&str] = &[
    "economy", "economic", "경제", "금융", "투자", "주식", "코스피", "증시", "달러", "원화", "환율",
    "금리", "인플레이션", "물가", "기업", "회사", "매출", "이익", "손실", "실적", "정책", "정부",
    "은행", "중앙은행",
];

/// Number of keywords found in the title, the body or any tag.
fn score(keywords: &[&str], title: &str, body: &str, tags: &[String]) -> usize {
    keywords
        .iter()
        .filter(|k| title.contains(*k) || body.contains(*k) || tags.iter().any(|t| t.contains(*k)))
        .count()
}

/// Pick the category whose keyword list matches more; ties go to automotive.
///
/// Matching is case-insensitive substring search.
pub fn categorize(title: &str, body: &str, tags: &[String]) -> Category {
    let title = title.to_lowercase();
    let body = body.to_lowercase();
    let tags: Vec<String> = tags.iter().map(|t| t.to_lowercase()).collect();

    let automotive = score(AUTOMOTIVE_KEYWORDS, &title, &body, &tags);
    let economy = score(ECONOMY_KEYWORDS, &title, &body, &tags);
    if automotive >= economy {
        Category::Automotive
    } else {
        Category::Economy
    }
}
