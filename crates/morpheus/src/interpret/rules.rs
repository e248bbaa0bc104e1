//! Keyword-table interpreter used when offline

use async_trait::async_trait;

use super::{Interpretation, InterpretationOutcome, Interpreter, GENERAL_THEME};
use crate::record::Emotion;

/// One row of the theme table
#[derive(Debug, Clone, Copy)]
pub struct ThemeRule {
  pub theme: &'static str,
  pub keywords: &'static [&'static str],
  pub interpretation: &'static str,
  pub recommendations: [&'static str; 3],
}

/// Themes in priority order; the first identified theme is primary
pub const THEME_RULES: [ThemeRule; 6] = [
  ThemeRule {
    theme: "falling",
    keywords: &["떨어지다", "추락", "높은 곳", "절벽", "계단", "엘리베이터"],
    interpretation: "추락하는 꿈은 현재 불안감이나 통제력 상실감을 나타냅니다. 중요한 결정을 내려야 하는 상황이나 변화에 대한 두려움과 관련이 있을 수 있습니다.",
    recommendations: [
      "현재 상황을 차근차근 정리해보세요",
      "명상이나 산책을 통해 마음을 정리해보세요",
      "신뢰할 수 있는 사람과 대화해보세요",
    ],
  },
  ThemeRule {
    theme: "chasing",
    keywords: &["쫓기다", "도망", "추격", "뒤쫓다", "숨다", "도주"],
    interpretation: "쫓기는 꿈은 현실에서 피하고 싶은 문제나 책임감을 나타냅니다. 해결해야 할 과제나 회피하고 싶은 상황이 있을 때 자주 나타납니다.",
    recommendations: [
      "피하고 있는 문제를 직면해보세요",
      "문제를 작은 단위로 나누어 해결해보세요",
      "도움을 요청하는 것을 두려워하지 마세요",
    ],
  },
  ThemeRule {
    theme: "flying",
    keywords: &["날다", "비행", "하늘", "공중", "날개", "떠다니다"],
    interpretation: "날아다니는 꿈은 자유로움과 해방감을 나타냅니다. 현실의 제약에서 벗어나고 싶은 욕망이나 새로운 가능성에 대한 기대를 의미할 수 있습니다.",
    recommendations: ["새로운 도전을 시도해보세요", "창의적인 활동에 참여해보세요", "자유로운 시간을 가져보세요"],
  },
  ThemeRule {
    theme: "water",
    keywords: &["물", "바다", "강", "호수", "비", "홍수", "수영"],
    interpretation: "물이 나오는 꿈은 감정의 상태를 나타냅니다. 맑은 물은 평온함을, 거친 물은 감정의 혼란을 의미할 수 있습니다.",
    recommendations: ["감정을 표현하는 방법을 찾아보세요", "일기를 써보세요", "예술 활동을 해보세요"],
  },
  ThemeRule {
    theme: "teeth",
    keywords: &["이빨", "치아", "빠지다", "부러지다", "피", "아프다"],
    interpretation: "이빨이 빠지는 꿈은 자신감의 상실이나 외모에 대한 걱정을 나타냅니다. 사회적 관계에서의 불안감이나 변화에 대한 두려움과 관련이 있습니다.",
    recommendations: [
      "자신감을 기르는 활동을 해보세요",
      "외모 관리에 신경 써보세요",
      "긍정적인 자기 대화를 해보세요",
    ],
  },
  ThemeRule {
    theme: "exam",
    keywords: &["시험", "시험장", "문제", "답안지", "교실", "선생님"],
    interpretation: "시험을 보는 꿈은 평가받는 상황이나 준비 부족에 대한 불안감을 나타냅니다. 중요한 일이나 도전 앞에서의 긴장감을 의미합니다.",
    recommendations: ["충분한 준비를 해보세요", "긍정적인 마인드를 유지하세요", "실패를 두려워하지 마세요"],
  },
];

const GENERAL_INTERPRETATION: &str =
  "꿈의 내용을 분석한 결과, 현재 상황과 관련된 심리적 상태를 반영하고 있습니다.";

const GENERAL_RECOMMENDATIONS: [&str; 3] = [
  "현재 상황을 차근차근 정리해보세요",
  "긍정적인 마인드를 유지하세요",
  "신뢰할 수 있는 사람과 대화해보세요",
];

const NO_THEME_CONFIDENCE: f64 = 0.3;
const PER_THEME_CONFIDENCE: f64 = 0.2;

impl ThemeRule {
  /// Case-insensitive substring match on any keyword
  fn matches(&self, lowered: &str) -> bool {
    self.keywords.iter().any(|k| lowered.contains(&k.to_lowercase()))
  }
}

/// Keyword interpreter over [`THEME_RULES`]
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedInterpreter;

impl RuleBasedInterpreter {
  pub fn new() -> Self {
    Self
  }

  /// Identified themes in table order
  pub fn identify_themes(&self, content: &str) -> Vec<&'static str> {
    let lowered = content.to_lowercase();
    THEME_RULES.iter().filter(|rule| rule.matches(&lowered)).map(|rule| rule.theme).collect()
  }

  /// Synchronous core of [`Interpreter::interpret`]
  pub fn analyze(&self, content: &str, emotion: Option<Emotion>) -> Interpretation {
    let themes = self.identify_themes(content);
    let primary = themes.first().and_then(|t| THEME_RULES.iter().find(|r| r.theme == *t));

    let mut interpretation =
      primary.map(|r| r.interpretation).unwrap_or(GENERAL_INTERPRETATION).to_string();
    if let Some(emotion) = emotion {
      interpretation.push_str(&format!(" 현재 {} 상태로 보입니다.", emotion.phrase()));
    }

    let recommendations = primary.map(|r| r.recommendations).unwrap_or(GENERAL_RECOMMENDATIONS);

    tracing::debug!(
      primary = primary.map(|r| r.theme).unwrap_or(GENERAL_THEME),
      matched = themes.len(),
      "keyword interpretation"
    );

    Interpretation {
      confidence: confidence_for(themes.len()),
      themes: themes.into_iter().map(str::to_string).collect(),
      interpretation,
      recommendations: recommendations.iter().map(|s| s.to_string()).collect(),
      outcome: InterpretationOutcome::Local,
    }
  }
}

fn confidence_for(theme_count: usize) -> f64 {
  if theme_count == 0 {
    NO_THEME_CONFIDENCE
  } else {
    (theme_count as f64 * PER_THEME_CONFIDENCE).min(1.0)
  }
}

#[async_trait]
impl Interpreter for RuleBasedInterpreter {
  async fn interpret(&self, content: &str, emotion: Option<Emotion>) -> Interpretation {
    self.analyze(content, emotion)
  }

  fn name(&self) -> &'static str {
    "keyword"
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
  }

  #[test]
  fn test_no_keywords_gives_general_result() {
    let result = RuleBasedInterpreter::new().analyze("아무 일도 없었던 평범한 하루", None);

    assert!(result.themes.is_empty());
    assert_eq!(result.confidence, 0.3);
    assert_eq!(result.interpretation, GENERAL_INTERPRETATION);
    assert_eq!(result.recommendations, GENERAL_RECOMMENDATIONS);
    assert_eq!(result.outcome, InterpretationOutcome::Local);
  }

  #[test]
  fn test_falling_scenario_with_fear() {
    let result = RuleBasedInterpreter::new()
      .analyze("어제 밤에 높은 곳에서 떨어지는 꿈을 꿨다", Some(Emotion::Fear));

    assert_eq!(result.themes, vec!["falling"]);
    assert_eq!(result.primary_theme(), "falling");
    assert!(result.interpretation.starts_with("추락하는 꿈은"));
    assert!(result.interpretation.ends_with(" 현재 불안하고 두려운 상태로 보입니다."));
    assert!(approx(result.confidence, 0.2));
    assert_eq!(result.recommendations, THEME_RULES[0].recommendations);
  }

  #[test]
  fn test_confidence_scales_with_distinct_themes() {
    let interpreter = RuleBasedInterpreter::new();

    // flying + water
    let two = interpreter.analyze("하늘을 날다가 바다에 빠졌다", None);
    assert_eq!(two.themes, vec!["flying", "water"]);
    assert!(approx(two.confidence, 0.4));

    // every theme at once, repeated keywords count once per theme
    let all = interpreter.analyze("추락 도망 비행 홍수 치아 시험 추락 추락", None);
    assert_eq!(all.themes.len(), 6);
    assert!(approx(all.confidence, 1.0));
  }

  #[test]
  fn test_confidence_formula() {
    for n in 0..=6 {
      let expected = if n == 0 { 0.3 } else { (n as f64 * 0.2).min(1.0) };
      assert!(approx(confidence_for(n), expected));
    }
  }

  #[test]
  fn test_primary_follows_table_order_not_text_order() {
    let result = RuleBasedInterpreter::new().analyze("시험을 보다가 절벽에서", None);

    assert_eq!(result.themes, vec!["falling", "exam"]);
    assert!(result.interpretation.starts_with("추락하는 꿈은"));
  }

  #[test]
  fn test_matching_is_case_insensitive() {
    // table keywords are Korean; lowercasing the input must not break matching
    let result = RuleBasedInterpreter::new().analyze("WATER 그리고 호수", Some(Emotion::Joy));

    assert_eq!(result.themes, vec!["water"]);
    assert!(result.interpretation.ends_with(" 현재 기쁘고 행복한 상태로 보입니다."));
  }

  #[test]
  fn test_confidence_stays_in_range() {
    let interpreter = RuleBasedInterpreter::new();
    for text in ["", "물", "물 하늘 시험", "떨어지다 쫓기다 날다 물 이빨 시험"] {
      let result = interpreter.analyze(text, None);
      assert!((0.0..=1.0).contains(&result.confidence), "{text}");
    }
  }
}
