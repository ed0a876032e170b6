//! `https:` 端点的 SQS 探测。
//!
//! 纯字符串判定，不发起任何网络请求：主机名形如 `sqs.<region>.amazonaws.com`
//! 或旧式的 `<region>.queue.amazonaws.com` 即视为 SQS 队列地址。

/// 判断一个 `https:` URL 是否指向 AWS SQS。
pub fn probe_sqs(url: &str) -> bool {
    let Some(rest) = url.strip_prefix("https://") else {
        return false;
    };
    let authority = rest.split(['/', '?']).next().unwrap_or_default();
    let host = authority.rsplit('@').next().unwrap_or(authority);
    let host = host.split(':').next().unwrap_or(host).to_ascii_lowercase();

    let Some(prefix) = host
        .strip_suffix(".amazonaws.com")
        .or_else(|| host.strip_suffix(".amazonaws.com.cn"))
    else {
        return false;
    };
    match prefix.split_once('.') {
        Some(("sqs", region)) => is_region(region),
        Some((region, "queue")) => is_region(region),
        _ => false,
    }
}

fn is_region(region: &str) -> bool {
    !region.is_empty()
        && region
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_sqs_hosts() {
        assert!(probe_sqs(
            "https://sqs.eu-central-1.amazonaws.com/123456789012/orders"
        ));
        assert!(probe_sqs(
            "https://us-east-1.queue.amazonaws.com/123456789012/orders?credprofile=ops"
        ));
        assert!(probe_sqs("https://SQS.us-west-2.amazonaws.com:443/1/q"));
    }

    #[test]
    fn ignores_other_https_hosts() {
        assert!(!probe_sqs("https://example.com/hook"));
        assert!(!probe_sqs("https://s3.us-east-1.amazonaws.com/bucket"));
        assert!(!probe_sqs("https://sqs.amazonaws.com.evil.example/1/q"));
        assert!(!probe_sqs("http://sqs.us-east-1.amazonaws.com/1/q"));
    }
}
