/// Two self-questions per point, in point order.
pub fn reflect<S: AsRef<str>>(points: &[S]) -> Vec<String> {
    let mut questions = Vec::with_capacity(points.len() * 2);
    for point in points {
        let point = point.as_ref();
        questions.push(format!("Why is '{point}' important?"));
        questions.push(format!("What assumptions are hidden inside '{point}'?"));
    }
    questions
}
