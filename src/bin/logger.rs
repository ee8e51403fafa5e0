use lockstep::lockstep_default_zenoh_prefix;
use zenoh::prelude::{SplitBuffer, ZFuture};

fn main() {
    let zenoh = zenoh::open(zenoh::config::Config::default())
        .wait()
        .unwrap();

    let topic = std::env::args()
        .nth(1)
        .unwrap_or_else(|| format!("{}/**", lockstep_default_zenoh_prefix()));
    let mut sub = zenoh.subscribe(topic).wait().unwrap();

    for sample in sub.receiver().iter() {
        let value = match String::from_utf8(sample.value.payload.contiguous().into_owned()) {
            Err(_) => "<invalid UTF8>".to_string(),
            Ok(v) => v,
        };

        println!(
            ">>>>> [{}] {}\n{}\n",
            sample
                .timestamp
                .map(|t| t.get_time().to_string())
                .unwrap_or_else(|| "<unknown>".to_owned()),
            sample.key_expr,
            value
        );
    }
}
