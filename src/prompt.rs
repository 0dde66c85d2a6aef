//! Instruction builder: turns a `GenerationRequest` into the text sent to the model.
//!
//! The instruction asks for a numbered markdown list whose items carry the
//! bold markers from `Vocabulary`. The extractor in `extract.rs` relies on
//! the same markers, so both sides read them from here.

use crate::catalog::subject_name;
use crate::domain::{GenerationRequest, Language};
use crate::util::fill_template;

/// Marker strings and prompt templates for one language.
#[derive(Debug)]
pub struct Vocabulary {
  pub problem_marker: &'static str,
  pub topic_marker: &'static str,
  pub solution_marker: &'static str,
  /// Lowercase word a topic annotation line starts with once bullets are stripped.
  pub topic_word: &'static str,
  /// Lowercase leading word of the solution marker.
  pub solution_word: &'static str,

  preamble: &'static str,
  task: &'static str,
  solution_line: &'static str,
  format_block: &'static str,
  solution_format_line: &'static str,
  closing: &'static str,

  pub empty_source_warning: &'static str,
  pub missing_key_warning: &'static str,
  pub invalid_request_warning: &'static str,
  pub error_label: &'static str,
}

static ENGLISH: Vocabulary = Vocabulary {
  problem_marker: "**Problem:**",
  topic_marker: "**Topic:**",
  solution_marker: "**Explanation/Solution:**",
  topic_word: "topic",
  solution_word: "explanation",

  preamble: "You are a {subject} teacher.\n\
Based on the content, topic and level of the problem given by the user, compose similar new problems.\n\
The problems must be logically consistent, their quantities must be solvable,\n\
and they must vary slightly (numbers and conditions).",
  task: "{preamble}\n\n\
TOPIC: {main_topic} - {subtopic}\n\n\
Problem given by the user:\n\n{user_problem}\n\n\n\
TASK:\n\
- Compose **{count}** new problems on the same topic ({main_topic} - {subtopic}) and at the same level as the problem above.\n\
- Vary the quantities and conditions.\n\
- Each problem: 1-2 paragraphs, clear and unambiguous.\n\
- Use the standard units and notation of {subject}.\n\
- Do not repeat conditions or numbers.",
  solution_line: "\n- For EACH PROBLEM include the main solution steps/answer with a short explanation.",
  format_block: "\n\nOUTPUT FORMAT:\n\
- As a markdown list.\n\
- Number every problem and write it like this:\n\n\
{n}. {problem_marker} ...\n   {topic_marker} {main_topic} - {subtopic}\n",
  solution_format_line: "   {solution_marker} ...\n",
  closing: "\nWrite in English.",

  empty_source_warning: "⚠️ Please enter the source problem first.\n",
  missing_key_warning: "⚠️ No API key configured. Set GOOGLE_API_KEY and restart the server.\n",
  invalid_request_warning: "⚠️ The request is not valid",
  error_label: "Error",
};

static MONGOLIAN: Vocabulary = Vocabulary {
  problem_marker: "**Бодлого:**",
  topic_marker: "**Сэдэв:**",
  solution_marker: "**Тайлбар/Шийд:**",
  topic_word: "сэдэв",
  solution_word: "тайлбар",

  preamble: "Та бол {subject} багш.\n\
Хэрэглэгчийн өгсөн бодлогын агуулга, сэдэв, түвшинд тулгуурлан төстэй шинэ бодлогууд зохионо.\n\
Бодлогууд нь мэдээллийн хувьд логик, хэмжигдэхүүнүүд нь бодогдохоор,\n\
бага зэрэг хувьсан өөрчлөгдсөн (тоо ба нөхцөл) байх ёстой.",
  task: "{preamble}\n\n\
СЭДЭВ: {main_topic} - {subtopic}\n\n\
Хэрэглэгчийн өгсөн бодлого:\n\n{user_problem}\n\n\n\
ҮҮСГЭХ ДААЛГАВАР:\n\
- Дээрх бодлоготой ижил сэдэв ({main_topic} - {subtopic}), нэг түвшний **{count}** шинэ бодлого зохионо.\n\
- Хэмжигдэхүүн, нөхцөлийг өөрчилж төрөлжүүл.\n\
- Бодлого бүр: 1-2 догол мөр, ойлгомжтой, нэг утгатай байг.\n\
- {subject} хичээлийн стандарт нэгж, тэмдэглэгээг ашигла.\n\
- Давхардсан нөхцөл, тоо бүү ашигла.",
  solution_line: "\n- БҮР БОДЛОГОД бодолтын үндсэн алхам/хариуг богино тайлбартай хамт оруул.",
  format_block: "\n\nГАРГАЛТЫН ХЭЛБЭР:\n\
- Маркдаун жагсаалт хэлбэрээр.\n\
- Бодлого бүрийг дугаарлаж, дараах маягаар бич:\n\n\
{n}. {problem_marker} ...\n   {topic_marker} {main_topic} - {subtopic}\n",
  solution_format_line: "   {solution_marker} ...\n",
  closing: "\nМонгол хэлээр бич.",

  empty_source_warning: "⚠️ Эх бодлогоо эхлээд бичнэ үү.\n",
  missing_key_warning: "⚠️ API түлхүүр оруулаагүй байна. GOOGLE_API_KEY тохируулаад серверээ дахин эхлүүлнэ үү.\n",
  invalid_request_warning: "⚠️ Хүсэлт буруу байна",
  error_label: "Алдаа",
};

pub fn vocabulary(language: Language) -> &'static Vocabulary {
  match language {
    Language::En => &ENGLISH,
    Language::Mn => &MONGOLIAN,
  }
}

/// Build the instruction for `req`.
///
/// Deterministic: identical requests give byte-identical output. The source
/// problem is embedded verbatim. Callers validate the request first; a blank
/// source problem is never passed in.
pub fn build_instruction(req: &GenerationRequest) -> String {
  let vocab = vocabulary(req.language);
  let subject = subject_name(req.language, req.subject);
  let count = req.count.to_string();

  let preamble = fill_template(vocab.preamble, &[("subject", subject)]);
  let mut out = fill_template(
    vocab.task,
    &[
      ("preamble", preamble.as_str()),
      ("main_topic", req.topic.as_str()),
      ("subtopic", req.subtopic.as_str()),
      ("user_problem", req.source_problem.as_str()),
      ("count", count.as_str()),
      ("subject", subject),
    ],
  );

  if req.include_solutions {
    out.push_str(vocab.solution_line);
  }

  // `{n}` is left in place: the model sees it as the numbering placeholder.
  out.push_str(&fill_template(
    vocab.format_block,
    &[
      ("problem_marker", vocab.problem_marker),
      ("topic_marker", vocab.topic_marker),
      ("main_topic", req.topic.as_str()),
      ("subtopic", req.subtopic.as_str()),
    ],
  ));

  if req.include_solutions {
    out.push_str(&fill_template(vocab.solution_format_line, &[("solution_marker", vocab.solution_marker)]));
  }

  out.push_str(vocab.closing);
  out
}
