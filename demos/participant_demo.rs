use clap::{Arg, Command};
use domaincore::dds::{
    listener::{DataReaderListener, DataWriterListener},
    qos::{
        policy::Reliability, DataReaderQos, DataReaderQosBuilder, DataWriterQos,
        DataWriterQosBuilder, DomainParticipantQos, PublisherQos, SubscriberQos, TopicQos,
    },
    status::{
        OfferedIncompatibleQosStatus, PublicationMatchedStatus, StatusKind, StatusMask,
        SubscriptionMatchedStatus,
    },
    DataReader, DataWriter, DomainParticipantFactory,
};
use domaincore::network::LoopbackTransport;
use domaincore::structure::{DdsEntity, Duration, TopicKind};
use log::LevelFilter;
use log4rs::{
    append::console::ConsoleAppender,
    config::{Appender, Config, Deserializers, Root},
    encode::pattern::PatternEncoder,
    init_config, init_file,
};
use std::sync::Arc;
use std::thread;
use std::time::Duration as StdDuration;

struct WriterMonitor;
impl DataWriterListener for WriterMonitor {
    fn on_publication_matched(&self, writer: &DataWriter, status: PublicationMatchedStatus) {
        println!(
            "writer {} matched {} reader(s), last: {}",
            writer.guid(),
            status.current_count,
            status.last_subscription_handle
        );
    }
    fn on_offered_incompatible_qos(&self, writer: &DataWriter, status: OfferedIncompatibleQosStatus) {
        println!(
            "writer {} offers incompatible QoS: {:?}",
            writer.guid(),
            status.last_policy_id
        );
    }
}

struct ReaderMonitor;
impl DataReaderListener for ReaderMonitor {
    fn on_subscription_matched(&self, reader: &DataReader, status: SubscriptionMatchedStatus) {
        println!(
            "reader {} matched {} writer(s), last: {}",
            reader.guid(),
            status.current_count,
            status.last_publication_handle
        );
    }
    fn on_data_available(&self, reader: &DataReader) {
        match reader.take() {
            Ok(samples) => {
                for s in samples {
                    println!(
                        "reader {} took #{}: {}",
                        reader.guid(),
                        s.sequence_number.0,
                        String::from_utf8_lossy(&s.data_value)
                    );
                }
            }
            Err(e) => eprintln!("take failed: {}", e),
        }
    }
}

fn parse_reliability(arg: Option<&str>) -> Reliability {
    match arg {
        Some("r") | Some("R") | None => Reliability::default_reliable(),
        Some("b") | Some("B") => Reliability::default_besteffort(),
        Some(c) => {
            println!(
                "Warning: unknown reliability '{}'. reliability must be 'r', 'R', 'b' or 'B'",
                c
            );
            Reliability::default_reliable()
        }
    }
}

fn main() {
    if let Err(_e) = init_file("participant_logging.yml", Deserializers::default()) {
        let stderr = ConsoleAppender::builder()
            .target(log4rs::append::console::Target::Stderr)
            .encoder(Box::new(PatternEncoder::new(
                "[{l}] [{d(%s%.f)}] [{t}]: {m}{n}",
            )))
            .build();

        let config = Config::builder()
            .appender(Appender::builder().build("stderr", Box::new(stderr)))
            .build(Root::builder().appender("stderr").build(LevelFilter::Warn))
            .unwrap();

        init_config(config).unwrap();
    }
    let args = Command::new("participant_demo")
        .arg(
            Arg::new("domain")
                .short('d')
                .help("domain id, 0 to 232")
                .required(false),
        )
        .arg(
            Arg::new("writer")
                .short('w')
                .help("writer reliability: Reliable(r|R) or BestEffort(b|B)")
                .required(false),
        )
        .arg(
            Arg::new("reader")
                .short('r')
                .help("reader reliability: Reliable(r|R) or BestEffort(b|B)")
                .required(false),
        )
        .arg(
            Arg::new("count")
                .short('n')
                .help("number of samples to write")
                .required(false),
        )
        .get_matches();
    let domain_id: u16 = args
        .get_one::<String>("domain")
        .and_then(|d| d.parse().ok())
        .unwrap_or(0);
    let count: usize = args
        .get_one::<String>("count")
        .and_then(|n| n.parse().ok())
        .unwrap_or(5);
    let writer_reliability = parse_reliability(args.get_one::<String>("writer").map(String::as_str));
    let reader_reliability = parse_reliability(args.get_one::<String>("reader").map(String::as_str));

    let factory = DomainParticipantFactory::new(Arc::new(LoopbackTransport::new()));
    let publishing = factory
        .create_participant(domain_id, DomainParticipantQos::Default, None, StatusMask::empty())
        .expect("couldn't create publishing participant");
    let subscribing = factory
        .create_participant(domain_id, DomainParticipantQos::Default, None, StatusMask::empty())
        .expect("couldn't create subscribing participant");

    let topic = publishing
        .create_topic("Square", "ShapeType", TopicKind::NoKey, TopicQos::Default, None, StatusMask::empty())
        .expect("couldn't create topic");
    let writer = publishing
        .create_publisher(PublisherQos::Default, None, StatusMask::empty())
        .and_then(|publisher| {
            publisher.create_datawriter(
                DataWriterQos::Policies(Box::new(
                    DataWriterQosBuilder::new()
                        .reliability(writer_reliability)
                        .build(),
                )),
                &topic,
                Some(Arc::new(WriterMonitor)),
                StatusKind::PublicationMatched | StatusKind::OfferedIncompatibleQos,
            )
        })
        .expect("couldn't create DataWriter");

    let topic = subscribing
        .create_topic("Square", "ShapeType", TopicKind::NoKey, TopicQos::Default, None, StatusMask::empty())
        .expect("couldn't create topic");
    let _reader = subscribing
        .create_subscriber(SubscriberQos::Default, None, StatusMask::empty())
        .and_then(|subscriber| {
            subscriber.create_datareader(
                DataReaderQos::Policies(Box::new(
                    DataReaderQosBuilder::new()
                        .reliability(reader_reliability)
                        .build(),
                )),
                &topic,
                Some(Arc::new(ReaderMonitor)),
                StatusKind::SubscriptionMatched | StatusKind::DataAvailable,
            )
        })
        .expect("couldn't create DataReader");

    match writer.wait_for_matched_subscriptions(1, Duration::from_secs(3)) {
        Ok(()) => {
            for i in 0..count {
                let message = format!("sample {}", i);
                if let Err(e) = writer.write(message.as_bytes()) {
                    eprintln!("write failed: {}", e);
                }
                thread::sleep(StdDuration::from_millis(200));
            }
            if let Err(e) = writer.wait_for_acknowledgments(Duration::from_secs(3)) {
                eprintln!("{}", e);
            }
        }
        Err(e) => eprintln!("no reader matched: {}", e),
    }

    for record in publishing.match_records().unwrap_or_default() {
        println!(
            "match record: {} -> {} since {}",
            record.local, record.remote, record.matched_at
        );
    }
    factory
        .delete_participant_recursive(&subscribing)
        .expect("couldn't delete subscribing participant");
    factory
        .delete_participant_recursive(&publishing)
        .expect("couldn't delete publishing participant");
}
