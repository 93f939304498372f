use nlq_ast::parse;

fn main() {
    let input = std::env::args()
        .skip(1)
        .collect::<Vec<_>>()
        .join(" ");
    let input = if input.is_empty() {
        "total amount by region where year = 2023 order by amount descending limit 10".to_string()
    } else {
        input
    };

    match parse(&input) {
        Ok(sentence) => {
            println!("pattern  = {}", sentence.template.pattern().name());
            println!("subject  = {:?}", sentence.template.subject());
            match &sentence.template {
                nlq_ast::Template::GroupedAggregate { group, .. } => println!("group    = {:?}", group),
                nlq_ast::Template::Ranked { order, .. } => println!("order    = {:?}", order),
                _ => {}
            }
        }
        Err(e) => println!("Error: {}", e),
    }
}
