//! Static subject → topic → subtopic vocabulary and the built-in example problems.
//!
//! Two tables per subject (English and Mongolian). Topic and subtopic order is
//! the order the form presents them in. Nothing here is mutable at runtime.

use crate::domain::{Language, Subject};

#[derive(Debug)]
pub struct TopicEntry {
  pub topic: &'static str,
  pub subtopics: &'static [&'static str],
}

const PHYSICS_EN: &[TopicEntry] = &[
  TopicEntry { topic: "Mechanics", subtopics: &["Kinematics", "Dynamics", "Statics", "Gravitation", "Conservation laws", "Torque"] },
  TopicEntry { topic: "Thermodynamics", subtopics: &["Gas laws", "Heat transfer", "Heat engines", "Entropy", "Laws of thermodynamics"] },
  TopicEntry { topic: "Electricity and Magnetism", subtopics: &["Electric field", "Electric current", "Magnetic field", "Electromagnetic induction", "RC and RL circuits"] },
  TopicEntry { topic: "Waves and Optics", subtopics: &["Wave properties", "Refraction of light", "Interference", "Diffraction gratings", "Polarization"] },
  TopicEntry { topic: "Modern Physics", subtopics: &["Quantum mechanics", "Relativity", "Atomic physics", "Nuclear physics", "Elementary particles"] },
];

const MATH_EN: &[TopicEntry] = &[
  TopicEntry { topic: "Algebra", subtopics: &["Equations", "Inequalities", "Polynomials", "Complex numbers", "Matrices and determinants"] },
  TopicEntry { topic: "Geometry", subtopics: &["Triangles", "Quadrilaterals", "Circles", "Geometric transformations", "Solid geometry"] },
  TopicEntry { topic: "Trigonometry", subtopics: &["Trigonometric functions", "Trigonometric equations", "Trigonometric inequalities", "Inverse trigonometric functions"] },
  TopicEntry { topic: "Calculus", subtopics: &["Derivatives", "Integrals", "Differential equations", "Function analysis", "Series"] },
  TopicEntry { topic: "Probability and Statistics", subtopics: &["Combinatorics", "Probability theory", "Random variables", "Descriptive statistics", "Regression analysis"] },
];

const PHYSICS_MN: &[TopicEntry] = &[
  TopicEntry { topic: "Механик", subtopics: &["Кинематик", "Динамик", "Статик", "Гравитаци", "Хөдөлгөөний хадгалалтын хууль", "Хүчний момент"] },
  TopicEntry { topic: "Термодинамик", subtopics: &["Хийн хууль", "Дулаан дамжуулалт", "Дулааны машин", "Энтропи", "Термодинамикийн хууль"] },
  TopicEntry { topic: "Цахилгаан ба Соронз", subtopics: &["Цахилгаан орон", "Цахилгаан гүйдэл", "Соронзон орон", "Цахилгаан соронзон индукц", "RC ба RL хэлхээ"] },
  TopicEntry { topic: "Долгион ба Оптик", subtopics: &["Долгионы шинж чанар", "Гэрлийн огилт", "Гэрлийн интерференц", "Гэрлийн туялзуур", "Хазайлт"] },
  TopicEntry { topic: "Орчин үеийн физик", subtopics: &["Квант механик", "Харьцангуй онол", "Атомын физик", "Цөмийн физик", "Элементар бөөмс"] },
];

const MATH_MN: &[TopicEntry] = &[
  TopicEntry { topic: "Алгебр", subtopics: &["Тэгшитгэл бодох", "Тэнцэтгэл биш", "Олон гишүүнт", "Комплекс тоо", "Матриц, тодорхойлогч"] },
  TopicEntry { topic: "Геометр", subtopics: &["Гурвалжин", "Дөрвөлжин", "Тойрог", "Геометр трансформац", "Стереометр"] },
  TopicEntry { topic: "Тригонометр", subtopics: &["Тригонометр функц", "Тригонометр тэгшитгэл", "Тригонометр тэнцэтгэл биш", "Инверс тригонометр функц"] },
  TopicEntry { topic: "Математик анализ", subtopics: &["Уламжлал", "Интеграл", "Дифференциал тэгшитгэл", "Функцийн судалгаа", "Ряд"] },
  TopicEntry { topic: "Магадлал ба Статистик", subtopics: &["Комбинаторик", "Магадлалын онол", "Санамсаргүй хэмжигдэхүүн", "Статистик дүн анализ", "Регрессийн анализ"] },
];

pub const SUBJECTS: [Subject; 2] = [Subject::Physics, Subject::Math];

pub fn topics(language: Language, subject: Subject) -> &'static [TopicEntry] {
  match (language, subject) {
    (Language::En, Subject::Physics) => PHYSICS_EN,
    (Language::En, Subject::Math) => MATH_EN,
    (Language::Mn, Subject::Physics) => PHYSICS_MN,
    (Language::Mn, Subject::Math) => MATH_MN,
  }
}

/// Ordered subtopics of `topic`, or None for a topic outside the table.
pub fn subtopics(language: Language, subject: Subject, topic: &str) -> Option<&'static [&'static str]> {
  topics(language, subject).iter().find(|t| t.topic == topic).map(|t| t.subtopics)
}

/// True if the (topic, subtopic) pair is part of the vocabulary.
pub fn contains(language: Language, subject: Subject, topic: &str, subtopic: &str) -> bool {
  subtopics(language, subject, topic).is_some_and(|subs| subs.contains(&subtopic))
}

/// Localized subject label, as used in the role-framing preamble.
pub fn subject_name(language: Language, subject: Subject) -> &'static str {
  match (language, subject) {
    (Language::En, Subject::Physics) => "Physics",
    (Language::En, Subject::Math) => "Math",
    (Language::Mn, Subject::Physics) => "Физик",
    (Language::Mn, Subject::Math) => "Математик",
  }
}

// Example texts, indexed the same way for both languages.
#[derive(Clone, Copy)]
enum Example {
  Kinematics,
  Dynamics,
  Collision,
  Circuit,
  Heat,
  Quadratic,
  Triangle,
  Extremum,
  Dice,
}

fn example_text(language: Language, ex: Example) -> &'static str {
  match (language, ex) {
    (Language::En, Example::Kinematics) => "A car moving at 72 km/h comes to a stop in 4 seconds. What are its acceleration and its stopping distance?",
    (Language::En, Example::Dynamics) => "A 2 kg body is pulled up a frictionless 15° incline. Find the pulling force acting on the body and its acceleration along the incline. g = 9.8 m/s².",
    (Language::En, Example::Collision) => "A 5 kg body moving at 10 m/s collides with a 2 kg body at rest. If the collision is elastic, find the velocities of the bodies after the collision.",
    (Language::En, Example::Circuit) => "A voltage of 12 V is applied to a conductor with a resistance of 10 Ω. What is the current? Find the heat released in the conductor over 5 minutes.",
    (Language::En, Example::Heat) => "Find the amount of heat needed to warm a 100 g body from 20°C to 80°C. The specific heat capacity of the body is 0.5 J/g°C.",
    (Language::En, Example::Quadratic) => "Find the real roots of the equation x² - 5x + 6 = 0. Also find the sum and the product of the roots.",
    (Language::En, Example::Triangle) => "The sides of a triangle are 6 cm, 8 cm and 10 cm. Check whether the triangle is right-angled and find its area.",
    (Language::En, Example::Extremum) => "Find the derivative of y = 2x² - 4x + 1 and determine its extremum points.",
    (Language::En, Example::Dice) => "A die is thrown once. Find: a) the probability of rolling a number greater than 4, b) the probability of rolling an even number.",
    (Language::Mn, Example::Kinematics) => "Машин 72 км/ц хурдтай явж байгаад 4 секундын дотор зогссон. Машины хурдатгал болон зогсох зам нь хэд вэ?",
    (Language::Mn, Example::Dynamics) => "15° налуу хавтгай дээр 2 кг масстай биетийг үрэлтгүй орчинд чирэхэд биед үйлчлэх татах хүч болон налуугийн дагуух хурдатгалыг ол. g=9.8 м/с².",
    (Language::Mn, Example::Collision) => "5 кг масстай бие 10 м/с хурдтайгаар хөдөлж байгаад 2 кг масстай тайван байгаа биетэй мөргөлдөв. Мөргөлдөөн уян хатан бол угсарсан биеийн хурдыг ол.",
    (Language::Mn, Example::Circuit) => "10 Ω эсэргүүцэлтэй дамжуулагчид 12 В хүчдэл залгахад гүйдэл хэд вэ? Дамжуулагчаар 5 минут явахад ялгарах дулааны хэмжээг ол.",
    (Language::Mn, Example::Heat) => "100 г масстай биеийн температур 20°C-аас 80°C хүртэл халаахад шаардагдах дулааны хэмжээг ол. Биеийн хувийн дулаан багтаамж 0.5 J/g°C байна.",
    (Language::Mn, Example::Quadratic) => "x² - 5x + 6 = 0 тэгшитгэлийн бодит шийдийг ол. Мөн язгууруудын нийлбэр ба үржвэрийг ол.",
    (Language::Mn, Example::Triangle) => "Гурвалжны талууд нь 6 см, 8 см, 10 см байна. Энэ гурвалжин тэгш өнцөгт эсэхийг шалгаад, талбайг нь ол.",
    (Language::Mn, Example::Extremum) => "y = 2x² - 4x + 1 функцийн уламжлалыг олж, экстремум цэгүүдийг тодорхойл.",
    (Language::Mn, Example::Dice) => "Нэг шоо шидэхэд: a) 4-өөс их тоо буух магадлал, b) тэгш тоо буух магадлалыг ол.",
  }
}

fn position(language: Language, subject: Subject, topic: &str, subtopic: &str) -> (Option<usize>, Option<usize>) {
  let table = topics(language, subject);
  match table.iter().position(|t| t.topic == topic) {
    Some(ti) => (Some(ti), table[ti].subtopics.iter().position(|s| *s == subtopic)),
    None => (None, None),
  }
}

/// Sample problem offered by the "fill with example" action.
/// Topics without a dedicated example share a generic one per subject.
pub fn example_problem(language: Language, subject: Subject, topic: &str, subtopic: &str) -> &'static str {
  let ex = match (subject, position(language, subject, topic, subtopic)) {
    (Subject::Physics, (Some(0), Some(0))) => Example::Kinematics,
    (Subject::Physics, (Some(0), Some(1))) => Example::Dynamics,
    (Subject::Physics, (Some(0), _)) => Example::Collision,
    (Subject::Physics, (Some(2), _)) => Example::Circuit,
    (Subject::Physics, _) => Example::Heat,
    (Subject::Math, (Some(0), _)) => Example::Quadratic,
    (Subject::Math, (Some(1), _)) => Example::Triangle,
    (Subject::Math, (Some(3), _)) => Example::Extremum,
    (Subject::Math, _) => Example::Dice,
  };
  example_text(language, ex)
}
