//! Rule-based body rewrite used when the generation API is bypassed.
//!
//! Every choice depends only on paragraph and sentence position, so the same
//! input always yields the same output.

use once_cell::sync::Lazy;
use regex::Regex;

/// Phrases swapped for one of their alternatives.
const SYNONYMS: &[(&str, &[&str])] = &[
    ("발표했다", &["공개했다", "밝혔다", "알렸다", "전했다", "공표했다"]),
    ("증가했다", &["늘어났다", "상승했다", "확대됐다", "성장했다", "오름세를 보였다"]),
    ("감소했다", &["줄어들었다", "하락했다", "축소됐다", "내림세를 보였다", "둔화됐다"]),
    ("계획이다", &["예정이다", "방침이다", "구상이다", "의도다", "계획을 세웠다"]),
    ("문제가", &["이슈가", "우려가", "쟁점이", "과제가", "난제가"]),
    ("중요하다", &["핵심적이다", "주요하다", "결정적이다", "필수적이다", "관건이다"]),
    ("진행됐다", &["이뤄졌다", "추진됐다", "실시됐다", "개최됐다", "펼쳐졌다"]),
];

/// Openers for the first sentence of every paragraph after the first.
const CONNECTORS: &[&str] = &[
    "한편",
    "또한",
    "이와 관련해",
    "특히",
    "더불어",
    "아울러",
    "그런 가운데",
    "이런 상황에서",
    "주목할 점은",
    "눈여겨볼 대목은",
    "업계에 따르면",
    "전문가들은",
    "관계자들에 의하면",
];

static PERCENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)%").expect("valid regex"));

const CLOSING: &str =
    "**이번 이슈는 업계에 중요한 시사점을 제공하고 있으며**, 향후 동향에 대한 지속적인 관심이 필요해 보입니다.";

fn substitute(text: &str, position: usize) -> String {
    let mut text = text.to_string();
    for (phrase, alternatives) in SYNONYMS {
        if text.contains(phrase) {
            let choice = alternatives[position % alternatives.len()];
            text = text.replace(phrase, choice);
        }
    }
    text
}

/// `None` when nothing but sentence separators is left.
fn rewrite_paragraph(paragraph: &str, index: usize) -> Option<String> {
    let pieces: Vec<&str> = paragraph.split('.').collect();
    if pieces.len() < 2 {
        return Some(substitute(paragraph.trim(), index));
    }

    let mut sentences = Vec::new();
    for (j, piece) in pieces.iter().enumerate() {
        let sentence = piece.trim();
        if sentence.is_empty() {
            continue;
        }
        let sentence = substitute(sentence, index + j);
        let mut sentence = PERCENT.replace_all(&sentence, "100명 중 ${1}명").into_owned();
        if j == 0 && index > 0 && !CONNECTORS.iter().any(|c| sentence.starts_with(c)) {
            sentence = format!("{} {}", CONNECTORS[index % CONNECTORS.len()], sentence);
        }
        sentences.push(sentence);
    }

    if sentences.is_empty() {
        return None;
    }
    if sentences.len() > 2 && index % 2 == 0 {
        sentences.rotate_right(1);
    }
    Some(format!("{}.", sentences.join(". ")))
}

/// Rewrite `body` and wrap it in the summary heading and section skeleton.
pub fn manual_rewrite(body: &str, title: &str) -> String {
    let paragraphs: Vec<String> = body
        .split("\n\n")
        .enumerate()
        .filter(|(_, p)| !p.trim().is_empty())
        .filter_map(|(i, p)| rewrite_paragraph(p, i))
        .collect();

    if paragraphs.is_empty() {
        return minimal_skeleton(title);
    }

    let section = |range: &[String]| range.join("\n\n");
    let intro = section(&paragraphs[..paragraphs.len().min(3)]);
    let points = paragraphs.get(3..paragraphs.len().min(6)).map(section).unwrap_or_default();
    let analysis = paragraphs.get(6..).map(section).unwrap_or_default();

    let out = format!(
        "##### **{title}의 핵심 내용 요약**<br>**업계 동향과 향후 전망 분석**\n\n\
         {intro}\n\n## 핵심 포인트\n\n{points}\n\n## 상세 분석\n\n{analysis}\n\n{CLOSING}"
    );
    out.trim().to_string()
}

fn minimal_skeleton(title: &str) -> String {
    format!(
        "##### **업계 주요 동향 핵심 분석**<br>**{title} 영향과 시장 전망**\n\n\
         본 기사는 현재 업계의 주요 동향을 다루고 있습니다.\n\n\
         ## 핵심 포인트\n\n\
         관련 업계에서는 이번 사안에 대해 **높은 관심을 보이고 있으며**, 다양한 의견이 제기되고 있는 상황입니다.\n\n\
         ## 향후 전망\n\n\
         이러한 변화는 시장에 중대한 영향을 미칠 것으로 예상되며, **관련 기업들의 대응 전략이 주목받고 있습니다**."
    )
}
